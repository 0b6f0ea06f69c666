//! Referential check: column values must exist in a reference table.

use super::{CheckExecutor, CheckKind, ColumnArity, ParamKind, ParamSpec, EXAMPLE_ROW_LIMIT};
use crate::config::CheckSpec;
use crate::engine::context::ExecutionContext;
use crate::engine::result::CheckEvaluation;
use crate::error::{Result, SentinelError};
use crate::security::escape_identifier;
use async_trait::async_trait;
use std::fmt::Write;
use tracing::{debug, instrument};

/// Checks that every non-null value of the target column appears in the
/// configured reference table's column. The reference table must be declared
/// under `data_source.references`.
#[derive(Debug)]
pub struct ReferentialCheck;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("reference_table", ParamKind::Text),
    ParamSpec::required("reference_column", ParamKind::Text),
    ParamSpec::optional("threshold", ParamKind::Number),
];

#[async_trait]
impl CheckExecutor for ReferentialCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Referential
    }

    fn column_arity(&self) -> ColumnArity {
        ColumnArity::One
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn validate_extra(&self, spec: &CheckSpec) -> Result<()> {
        for param in ["reference_table", "reference_column"] {
            let value = spec
                .param_str(param)
                .ok_or_else(|| {
                    SentinelError::configuration(format!("missing required parameter '{param}'"))
                })?;
            escape_identifier(value)?;
        }
        Ok(())
    }

    #[instrument(skip(self, ctx, spec), fields(check.kind = %self.kind()))]
    async fn execute(&self, ctx: &ExecutionContext, spec: &CheckSpec) -> Result<CheckEvaluation> {
        let column = spec.target().label();
        let identifier = escape_identifier(&column)?;
        // Identifiers were escaped at validation time; escape again here so a
        // programmatically built spec gets the same treatment.
        let ref_table = escape_identifier(spec.param_str("reference_table").unwrap_or_default())?;
        let ref_column = escape_identifier(spec.param_str("reference_column").unwrap_or_default())?;
        let threshold = spec.threshold();
        let table = ctx.table_name();

        let total = ctx
            .aggregate_scalar(&format!("SELECT COUNT({identifier}) FROM {table}"))
            .await?;
        if total == 0.0 {
            return Ok(CheckEvaluation::passed_vacuous("no non-null values to validate"));
        }

        let orphan_predicate = format!(
            "{identifier} IS NOT NULL AND {identifier} NOT IN \
             (SELECT {ref_column} FROM {ref_table} WHERE {ref_column} IS NOT NULL)"
        );
        let orphans = ctx
            .aggregate_scalar(&format!(
                "SELECT COUNT(*) FROM {table} WHERE {orphan_predicate}"
            ))
            .await?;
        let coverage = 1.0 - orphans / total;
        debug!(
            check.column = %column,
            check.reference = %format!("{ref_table}.{ref_column}"),
            result.coverage = coverage,
            result.orphans = orphans as i64,
            "Evaluated referential integrity"
        );

        if coverage >= threshold {
            return Ok(CheckEvaluation::passed_with_metric(coverage));
        }

        let mut detail = format!(
            "column '{column}' has {} of {} values missing from {}.{}",
            orphans as i64,
            total as i64,
            spec.param_str("reference_table").unwrap_or_default(),
            spec.param_str("reference_column").unwrap_or_default(),
        );
        let examples = ctx.sample(&orphan_predicate, EXAMPLE_ROW_LIMIT).await?;
        if !examples.is_empty() {
            let _ = write!(detail, "\nexample rows:\n{examples}");
        }
        Ok(CheckEvaluation::failed_with_metric(coverage, detail))
    }
}
