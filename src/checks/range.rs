//! Range check: numeric values within configured bounds.

use super::{CheckExecutor, CheckKind, ColumnArity, ParamKind, ParamSpec, EXAMPLE_ROW_LIMIT};
use crate::config::CheckSpec;
use crate::engine::context::ExecutionContext;
use crate::engine::result::CheckEvaluation;
use crate::error::{Result, SentinelError};
use crate::security::escape_identifier;
use async_trait::async_trait;
use std::fmt::Write;
use tracing::{debug, instrument};

/// Checks that a column's non-null values fall inside `[min, max]`. At least
/// one bound is required; the optional threshold allows a tolerated fraction
/// of out-of-range values.
#[derive(Debug)]
pub struct RangeCheck;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("min", ParamKind::Number),
    ParamSpec::optional("max", ParamKind::Number),
    ParamSpec::optional("threshold", ParamKind::Number),
];

impl RangeCheck {
    fn violation_predicate(identifier: &str, min: Option<f64>, max: Option<f64>) -> String {
        match (min, max) {
            (Some(min), Some(max)) => {
                format!("{identifier} < {min} OR {identifier} > {max}")
            }
            (Some(min), None) => format!("{identifier} < {min}"),
            (None, Some(max)) => format!("{identifier} > {max}"),
            (None, None) => unreachable!("validated: at least one bound present"),
        }
    }

    fn bounds_label(min: Option<f64>, max: Option<f64>) -> String {
        match (min, max) {
            (Some(min), Some(max)) => format!("[{min}, {max}]"),
            (Some(min), None) => format!(">= {min}"),
            (None, Some(max)) => format!("<= {max}"),
            (None, None) => unreachable!("validated: at least one bound present"),
        }
    }
}

#[async_trait]
impl CheckExecutor for RangeCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Range
    }

    fn column_arity(&self) -> ColumnArity {
        ColumnArity::One
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn validate_extra(&self, spec: &CheckSpec) -> Result<()> {
        let min = spec.param_f64("min");
        let max = spec.param_f64("max");
        if min.is_none() && max.is_none() {
            return Err(SentinelError::configuration(
                "range check requires at least one of `min` and `max`",
            ));
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(SentinelError::configuration(format!(
                    "range check has min {min} greater than max {max}"
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, ctx, spec), fields(check.kind = %self.kind()))]
    async fn execute(&self, ctx: &ExecutionContext, spec: &CheckSpec) -> Result<CheckEvaluation> {
        let column = spec.target().label();
        let identifier = escape_identifier(&column)?;
        let min = spec.param_f64("min");
        let max = spec.param_f64("max");
        let threshold = spec.threshold();
        let table = ctx.table_name();

        let violation = Self::violation_predicate(&identifier, min, max);
        let sql = format!(
            "SELECT COUNT({identifier}) AS considered, \
             COUNT(CASE WHEN {violation} THEN 1 END) AS out_of_range \
             FROM {table}"
        );
        let row = ctx.aggregate_row(&sql).await?;
        let (considered, out_of_range) = (row[0], row[1]);
        if considered == 0.0 {
            return Ok(CheckEvaluation::passed_vacuous("no non-null values to validate"));
        }

        let in_range_ratio = 1.0 - out_of_range / considered;
        debug!(
            check.column = %column,
            check.bounds = %Self::bounds_label(min, max),
            result.in_range_ratio = in_range_ratio,
            result.out_of_range = out_of_range as i64,
            "Evaluated range check"
        );

        if in_range_ratio >= threshold {
            return Ok(CheckEvaluation::passed_with_metric(in_range_ratio));
        }

        let mut detail = format!(
            "column '{column}' has {} of {} values outside {}",
            out_of_range as i64,
            considered as i64,
            Self::bounds_label(min, max),
        );
        let examples = ctx.sample(&violation, EXAMPLE_ROW_LIMIT).await?;
        if !examples.is_empty() {
            let _ = write!(detail, "\nexample rows:\n{examples}");
        }
        Ok(CheckEvaluation::failed_with_metric(in_range_ratio, detail))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ParamValue;
    use crate::engine::result::OutcomeStatus;
    use crate::test_support::{check_spec, context_for_csv, run_check};

    const CSV: &str = "id,amount\n1,5\n2,7\n3,9\n4,3\n";

    #[tokio::test]
    async fn test_values_within_bounds_pass() {
        let (ctx, _file) = context_for_csv(CSV).await;
        let spec = check_spec(
            "range",
            Some("amount"),
            &[("min", ParamValue::Int(0)), ("max", ParamValue::Int(10))],
        );
        let evaluation = run_check(&ctx, &spec).await.unwrap();
        assert_eq!(evaluation.status, OutcomeStatus::Passed);
        assert_eq!(evaluation.metric, Some(1.0));
    }

    #[tokio::test]
    async fn test_out_of_range_value_fails() {
        let (ctx, _file) = context_for_csv("id,amount\n1,5\n2,42\n3,9\n4,3\n").await;
        let spec = check_spec(
            "range",
            Some("amount"),
            &[("min", ParamValue::Int(0)), ("max", ParamValue::Int(10))],
        );
        let evaluation = run_check(&ctx, &spec).await.unwrap();
        assert_eq!(evaluation.status, OutcomeStatus::Failed);
        assert_eq!(evaluation.metric, Some(0.75));
        assert!(evaluation.detail.unwrap().contains("outside [0, 10]"));
    }

    #[tokio::test]
    async fn test_single_bound() {
        let (ctx, _file) = context_for_csv(CSV).await;
        let spec = check_spec("range", Some("amount"), &[("min", ParamValue::Int(4))]);
        let evaluation = run_check(&ctx, &spec).await.unwrap();
        assert_eq!(evaluation.status, OutcomeStatus::Failed);
        assert_eq!(evaluation.metric, Some(0.75));
    }

    #[tokio::test]
    async fn test_nulls_are_ignored() {
        let (ctx, _file) = context_for_csv("id,amount\n1,5\n2,\n3,9\n").await;
        let spec = check_spec(
            "range",
            Some("amount"),
            &[("min", ParamValue::Int(0)), ("max", ParamValue::Int(10))],
        );
        let evaluation = run_check(&ctx, &spec).await.unwrap();
        assert_eq!(evaluation.status, OutcomeStatus::Passed);
    }

    #[tokio::test]
    async fn test_missing_column_errors_at_query_time() {
        let (ctx, _file) = context_for_csv("id,name\n1,alice\n2,bob\n").await;
        let spec = check_spec(
            "range",
            Some("no_such_column"),
            &[("min", ParamValue::Int(0)), ("max", ParamValue::Int(10))],
        );
        // Column existence is only known to the backend; the engine captures
        // this as an errored outcome.
        assert!(run_check(&ctx, &spec).await.is_err());
    }
}
