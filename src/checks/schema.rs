//! Schema-shape check: required columns and optional column count.

use super::{CheckExecutor, CheckKind, ColumnArity, ParamKind, ParamSpec};
use crate::config::CheckSpec;
use crate::engine::context::ExecutionContext;
use crate::engine::result::CheckEvaluation;
use crate::error::{Result, SentinelError};
use crate::security::validate_identifier;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Checks the table's shape: all named columns present, and optionally an
/// exact total column count.
#[derive(Debug)]
pub struct SchemaCheck;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("columns", ParamKind::TextList),
    ParamSpec::optional("column_count", ParamKind::Number),
];

#[async_trait]
impl CheckExecutor for SchemaCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Schema
    }

    fn column_arity(&self) -> ColumnArity {
        ColumnArity::None
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn validate_extra(&self, spec: &CheckSpec) -> Result<()> {
        let columns = spec
            .param_list("columns")
            .ok_or_else(|| SentinelError::configuration("missing required parameter 'columns'"))?;
        if columns.is_empty() {
            return Err(SentinelError::configuration(
                "schema check requires a non-empty 'columns' list",
            ));
        }
        for column in columns {
            validate_identifier(column)?;
        }
        Ok(())
    }

    #[instrument(skip(self, ctx, spec), fields(check.kind = %self.kind()))]
    async fn execute(&self, ctx: &ExecutionContext, spec: &CheckSpec) -> Result<CheckEvaluation> {
        let required = spec.param_list("columns").unwrap_or_default();
        let expected_count = spec.param_f64("column_count").map(|count| count as usize);

        let schema = ctx.table_schema().await?;
        let actual: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();

        let missing: Vec<&str> = required
            .iter()
            .map(String::as_str)
            .filter(|column| !actual.contains(column))
            .collect();
        let present = required.len() - missing.len();
        let metric = present as f64 / required.len() as f64;
        debug!(
            schema.columns = actual.len(),
            schema.required = required.len(),
            schema.missing = missing.len(),
            "Evaluated schema shape"
        );

        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(format!("missing column(s): {}", missing.join(", ")));
        }
        if let Some(expected) = expected_count {
            if actual.len() != expected {
                problems.push(format!(
                    "expected {expected} columns, found {}",
                    actual.len()
                ));
            }
        }

        if problems.is_empty() {
            Ok(CheckEvaluation::passed_with_metric(metric))
        } else {
            Ok(CheckEvaluation::failed_with_metric(
                metric,
                format!(
                    "{}; table columns: {}",
                    problems.join("; "),
                    actual.join(", ")
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ParamValue;
    use crate::engine::result::OutcomeStatus;
    use crate::test_support::{check_spec, context_for_csv, run_check};

    fn columns(names: &[&str]) -> ParamValue {
        ParamValue::List(names.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn test_required_columns_present() {
        let (ctx, _file) = context_for_csv("id,name,amount\n1,a,2\n").await;
        let spec = check_spec("schema", None, &[("columns", columns(&["id", "amount"]))]);
        let evaluation = run_check(&ctx, &spec).await.unwrap();
        assert_eq!(evaluation.status, OutcomeStatus::Passed);
        assert_eq!(evaluation.metric, Some(1.0));
    }

    #[tokio::test]
    async fn test_missing_column_fails() {
        let (ctx, _file) = context_for_csv("id,name\n1,a\n").await;
        let spec = check_spec("schema", None, &[("columns", columns(&["id", "amount"]))]);
        let evaluation = run_check(&ctx, &spec).await.unwrap();
        assert_eq!(evaluation.status, OutcomeStatus::Failed);
        assert_eq!(evaluation.metric, Some(0.5));
        assert!(evaluation.detail.unwrap().contains("missing column(s): amount"));
    }

    #[tokio::test]
    async fn test_column_count_mismatch_fails() {
        let (ctx, _file) = context_for_csv("id,name\n1,a\n").await;
        let spec = check_spec(
            "schema",
            None,
            &[
                ("columns", columns(&["id"])),
                ("column_count", ParamValue::Int(3)),
            ],
        );
        let evaluation = run_check(&ctx, &spec).await.unwrap();
        assert_eq!(evaluation.status, OutcomeStatus::Failed);
        assert!(evaluation.detail.unwrap().contains("expected 3 columns, found 2"));
    }
}
