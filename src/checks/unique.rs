//! Uniqueness check over one or more columns.

use super::{CheckExecutor, CheckKind, ColumnArity, ParamKind, ParamSpec};
use crate::config::CheckSpec;
use crate::engine::context::ExecutionContext;
use crate::engine::result::CheckEvaluation;
use crate::error::Result;
use crate::security::escape_identifier;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Checks that the ratio of rows whose key appears exactly once meets a
/// threshold (default 1.0: every key unique). Matches the Deequ notion of
/// uniqueness rather than plain distinctness.
#[derive(Debug)]
pub struct UniqueCheck;

const PARAMS: &[ParamSpec] = &[ParamSpec::optional("threshold", ParamKind::Number)];

#[async_trait]
impl CheckExecutor for UniqueCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Unique
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
        let key: Vec<String> = target
            .columns()
            .iter()
            .map(|column| escape_identifier(column))
            .collect::<Result<_>>()?;
        let key = key.join(", ");

        let total = ctx
            .aggregate_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .await?;
        if total == 0.0 {
            return Ok(CheckEvaluation::passed_vacuous("no rows to validate"));
        }

        let unique_rows = ctx
            .aggregate_scalar(&format!(
                "SELECT COUNT(*) FROM \
                 (SELECT {key} FROM {table} GROUP BY {key} HAVING COUNT(*) = 1) u"
            ))
            .await?;
        let uniqueness = unique_rows / total;
        debug!(
            check.key = %target.label(),
            check.threshold = threshold,
            result.uniqueness = uniqueness,
            "Evaluated uniqueness"
        );

        if uniqueness >= threshold {
            return Ok(CheckEvaluation::passed_with_metric(uniqueness));
        }

        let duplicate_groups = ctx
            .aggregate_scalar(&format!(
                "SELECT COUNT(*) FROM \
                 (SELECT {key} FROM {table} GROUP BY {key} HAVING COUNT(*) > 1) d"
            ))
            .await?;
        Ok(CheckEvaluation::failed_with_metric(
            uniqueness,
            format!(
                "key ({}) uniqueness {:.2}% is below threshold {:.2}%: \
                 {} duplicated value group(s) across {} rows",
                target.label(),
                uniqueness * 100.0,
                threshold * 100.0,
                duplicate_groups as i64,
                total as i64,
            ),
        ))
    }
}
