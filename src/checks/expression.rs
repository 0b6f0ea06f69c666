//! Expression check: an arbitrary SQL predicate must hold for every row.

use super::{CheckExecutor, CheckKind, ColumnArity, ParamKind, ParamSpec, EXAMPLE_ROW_LIMIT};
use crate::config::CheckSpec;
use crate::engine::context::ExecutionContext;
use crate::engine::result::CheckEvaluation;
use crate::error::{Result, SentinelError};
use crate::security::validate_sql_expression;
use async_trait::async_trait;
use std::fmt::Write;
use tracing::{debug, instrument};

/// Evaluates a whole-table SQL predicate and measures the fraction of rows
/// that satisfy it. Rows where the predicate is NULL count as violations.
#[derive(Debug)]
pub struct ExpressionCheck;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("expression", ParamKind::Text),
    ParamSpec::optional("threshold", ParamKind::Number),
];

#[async_trait]
impl CheckExecutor for ExpressionCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Expression
    }

    fn column_arity(&self) -> ColumnArity {
        ColumnArity::None
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn validate_extra(&self, spec: &CheckSpec) -> Result<()> {
        let expression = spec.param_str("expression").ok_or_else(|| {
            SentinelError::configuration("missing required parameter 'expression'")
        })?;
        validate_sql_expression(expression)
    }

    #[instrument(skip(self, ctx, spec), fields(check.kind = %self.kind()))]
    async fn execute(&self, ctx: &ExecutionContext, spec: &CheckSpec) -> Result<CheckEvaluation> {
        let expression = spec.param_str("expression").unwrap_or_default();
        validate_sql_expression(expression)?;
        let threshold = spec.threshold();
        let table = ctx.table_name();

        // `IS DISTINCT FROM TRUE` treats NULL predicate results as violations.
        let violation_predicate = format!("({expression}) IS DISTINCT FROM TRUE");
        let row = ctx
            .aggregate_row(&format!(
                "SELECT COUNT(*) AS total, \
                 COUNT(CASE WHEN {violation_predicate} THEN 1 END) AS violations \
                 FROM {table}"
            ))
            .await?;
        let (total, violations) = (row[0], row[1]);
        if total == 0.0 {
            return Ok(CheckEvaluation::passed_vacuous("no rows to validate"));
        }

        let satisfied = 1.0 - violations / total;
        debug!(
            check.expression = %expression,
            result.satisfied = satisfied,
            result.violations = violations as i64,
            "Evaluated expression"
        );

        if satisfied >= threshold {
            return Ok(CheckEvaluation::passed_with_metric(satisfied));
        }

        let mut detail = format!(
            "expression '{expression}' violated by {} of {} rows",
            violations as i64, total as i64
        );
        let examples = ctx.sample(&violation_predicate, EXAMPLE_ROW_LIMIT).await?;
        if !examples.is_empty() {
            let _ = write!(detail, "\nexample rows:\n{examples}");
        }
        Ok(CheckEvaluation::failed_with_metric(satisfied, detail))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ParamValue;
    use crate::engine::result::OutcomeStatus;
    use crate::test_support::{check_spec, context_for_csv, run_check};

    fn expression_spec(expr: &str) -> crate::config::CheckSpec {
        check_spec(
            "expression",
            None,
            &[("expression", ParamValue::Str(expr.to_string()))],
        )
    }

    #[tokio::test]
    async fn test_expression_holds_for_all_rows() {
        let (ctx, _file) = context_for_csv("qty,price\n1,10\n2,20\n3,30\n").await;
        let evaluation = run_check(&ctx, &expression_spec("qty * price >= qty"))
            .await
            .unwrap();
        assert_eq!(evaluation.status, OutcomeStatus::Passed);
        assert_eq!(evaluation.metric, Some(1.0));
    }

    #[tokio::test]
    async fn test_violating_rows_fail() {
        let (ctx, _file) = context_for_csv("qty,price\n1,10\n2,-5\n3,30\n-1,2\n").await;
        let evaluation = run_check(&ctx, &expression_spec("qty > 0 AND price > 0"))
            .await
            .unwrap();
        assert_eq!(evaluation.status, OutcomeStatus::Failed);
        assert_eq!(evaluation.metric, Some(0.5));
        assert!(evaluation.detail.unwrap().contains("violated by 2 of 4 rows"));
    }

    #[tokio::test]
    async fn test_null_predicate_counts_as_violation() {
        let (ctx, _file) = context_for_csv("id,qty\n1,1\n2,\n3,3\n").await;
        let evaluation = run_check(&ctx, &expression_spec("qty > 0")).await.unwrap();
        assert_eq!(evaluation.status, OutcomeStatus::Failed);
        let metric = evaluation.metric.unwrap();
        assert!((metric - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rejects_statement_separator() {
        let spec = expression_spec("qty > 0; DROP TABLE data");
        let registry = crate::checks::registry();
        let executor = registry.resolve(&spec.check_type).unwrap();
        assert!(executor.validate_spec(&spec).is_err());
    }
}
