//! Shared helpers for check executor and engine tests.

use crate::checks::registry;
use crate::config::{CheckSpec, DataSourceSpec, ParamValue, ReferenceTable, SourceKind};
use crate::engine::context::ExecutionContext;
use crate::engine::result::CheckEvaluation;
use crate::error::Result;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

/// Writes CSV content to a temp file with a `.csv` suffix so the backend
/// recognizes the format. The file is deleted when the handle drops, so
/// callers must keep it alive for the context's lifetime.
pub(crate) fn write_csv(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("create temp csv");
    file.write_all(content.as_bytes()).expect("write temp csv");
    file.flush().expect("flush temp csv");
    file
}

/// Opens an execution context over a single in-temp-file CSV table.
pub(crate) async fn context_for_csv(csv: &str) -> (ExecutionContext, NamedTempFile) {
    let file = write_csv(csv);
    let source = DataSourceSpec {
        kind: SourceKind::Csv,
        location: file.path().to_string_lossy().into_owned(),
        sample_fraction: None,
        references: Vec::new(),
    };
    let ctx = ExecutionContext::open(&source).await.expect("open context");
    (ctx, file)
}

/// Opens an execution context with a primary CSV table plus one reference
/// table registered under `reference_name`.
pub(crate) async fn context_for_csv_with_reference(
    primary_csv: &str,
    reference_name: &str,
    reference_csv: &str,
) -> (ExecutionContext, (NamedTempFile, NamedTempFile)) {
    let primary = write_csv(primary_csv);
    let reference = write_csv(reference_csv);
    let source = DataSourceSpec {
        kind: SourceKind::Csv,
        location: primary.path().to_string_lossy().into_owned(),
        sample_fraction: None,
        references: vec![ReferenceTable {
            name: reference_name.to_string(),
            kind: SourceKind::Csv,
            location: reference.path().to_string_lossy().into_owned(),
        }],
    };
    let ctx = ExecutionContext::open(&source).await.expect("open context");
    (ctx, (primary, reference))
}

/// Builds a check spec from the pieces tests care about.
pub(crate) fn check_spec(
    check_type: &str,
    column: Option<&str>,
    params: &[(&str, ParamValue)],
) -> CheckSpec {
    CheckSpec {
        check_type: check_type.to_string(),
        column: column.map(ToString::to_string),
        columns: Vec::new(),
        params: params
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Resolves and runs a single check against the context.
pub(crate) async fn run_check(
    ctx: &ExecutionContext,
    spec: &CheckSpec,
) -> Result<CheckEvaluation> {
    let executor = registry().resolve(&spec.check_type)?;
    executor.execute(ctx, spec).await
}
