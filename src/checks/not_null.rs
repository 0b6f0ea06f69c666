//! Null check: completeness (non-null ratio) of one or more columns.

use super::{CheckExecutor, CheckKind, ColumnArity, ParamKind, ParamSpec, EXAMPLE_ROW_LIMIT};
use crate::config::CheckSpec;
use crate::engine::context::ExecutionContext;
use crate::engine::result::CheckEvaluation;
use crate::error::Result;
use crate::security::escape_identifier;
use async_trait::async_trait;
use std::fmt::Write;
use tracing::{debug, instrument};

/// Checks that each target column's non-null ratio meets a threshold
/// (default 1.0, i.e. no nulls allowed).
#[derive(Debug)]
pub struct NotNullCheck;

const PARAMS: &[ParamSpec] = &[ParamSpec::optional("threshold", ParamKind::Number)];

#[async_trait]
impl CheckExecutor for NotNullCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::NotNull
    }

    fn column_arity(&self) -> ColumnArity {
        ColumnArity::OneOrMany
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    #[instrument(skip(self, ctx, spec), fields(check.kind = %self.kind()))]
    async fn execute(&self, ctx: &ExecutionContext, spec: &CheckSpec) -> Result<CheckEvaluation> {
        let threshold = spec.threshold();
        let table = ctx.table_name();
        let target = spec.target();

        let mut worst_completeness = 1.0f64;
        let mut failures: Vec<String> = Vec::new();
        let mut first_failing_column: Option<String> = None;

        for column in target.columns() {
            let identifier = escape_identifier(column)?;
            let sql = format!(
                "SELECT COUNT(*) AS total, COUNT({identifier}) AS non_null FROM {table}"
            );
            let row = ctx.aggregate_row(&sql).await?;
            let (total, non_null) = (row[0], row[1]);
            if total == 0.0 {
                return Ok(CheckEvaluation::passed_vacuous("no rows to validate"));
            }

            let completeness = non_null / total;
            debug!(
                check.column = column,
                check.threshold = threshold,
                result.completeness = completeness,
                "Evaluated column completeness"
            );
            worst_completeness = worst_completeness.min(completeness);
            if completeness < threshold {
                let null_count = (total - non_null) as i64;
                failures.push(format!(
                    "column '{column}' completeness {:.2}% is below threshold {:.2}% ({null_count} of {} rows null)",
                    completeness * 100.0,
                    threshold * 100.0,
                    total as i64,
                ));
                first_failing_column.get_or_insert_with(|| column.to_string());
            }
        }

        if failures.is_empty() {
            return Ok(CheckEvaluation::passed_with_metric(worst_completeness));
        }

        let mut detail = failures.join("; ");
        if let Some(column) = first_failing_column {
            let identifier = escape_identifier(&column)?;
            let examples = ctx
                .sample(&format!("{identifier} IS NULL"), EXAMPLE_ROW_LIMIT)
                .await?;
            if !examples.is_empty() {
                let _ = write!(detail, "\nexample rows:\n{examples}");
            }
        }
        Ok(CheckEvaluation::failed_with_metric(worst_completeness, detail))
    }
}
