//! Check executors and the static registry that resolves them.
//!
//! Each check family implements [`CheckExecutor`]: a declared parameter set
//! validated at configuration-parse time, and an `execute` capability run
//! against the [`ExecutionContext`]. Registration happens once at process
//! start; unknown check-type identifiers are rejected while the configuration
//! is validated, so a malformed configuration never starts partial work.

use crate::config::{CheckSpec, CheckTarget, ParamValue};
use crate::engine::context::ExecutionContext;
use crate::engine::result::CheckEvaluation;
use crate::error::{Result, SentinelError};
use crate::security::validate_identifier;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt::Debug;

mod expression;
mod not_null;
mod range;
mod referential;
mod schema;
mod unique;

pub use expression::ExpressionCheck;
pub use not_null::NotNullCheck;
pub use range::RangeCheck;
pub use referential::ReferentialCheck;
pub use schema::SchemaCheck;
pub use unique::UniqueCheck;

/// How many example rows to embed in failure diagnostics.
pub(crate) const EXAMPLE_ROW_LIMIT: usize = 5;

/// The closed set of check families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Column completeness (non-null ratio)
    NotNull,
    /// Numeric values within bounds
    Range,
    /// Row uniqueness over one or more columns
    Unique,
    /// Schema shape (required columns, column count)
    Schema,
    /// Values present in a reference table
    Referential,
    /// Custom SQL predicate over the whole table
    Expression,
}

impl CheckKind {
    /// The identifier used in configuration files.
    pub fn id(&self) -> &'static str {
        match self {
            CheckKind::NotNull => "not_null",
            CheckKind::Range => "range",
            CheckKind::Unique => "unique",
            CheckKind::Schema => "schema",
            CheckKind::Referential => "referential",
            CheckKind::Expression => "expression",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Declared type of a check parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Integer or float
    Number,
    /// String
    Text,
    /// List of strings
    TextList,
    /// Boolean
    Flag,
}

impl ParamKind {
    fn matches(&self, value: &ParamValue) -> bool {
        matches!(
            (self, value),
            (ParamKind::Number, ParamValue::Int(_))
                | (ParamKind::Number, ParamValue::Float(_))
                | (ParamKind::Text, ParamValue::Str(_))
                | (ParamKind::TextList, ParamValue::List(_))
                | (ParamKind::Flag, ParamValue::Bool(_))
        )
    }

    fn name(&self) -> &'static str {
        match self {
            ParamKind::Number => "number",
            ParamKind::Text => "string",
            ParamKind::TextList => "list of strings",
            ParamKind::Flag => "boolean",
        }
    }
}

/// Declaration of one check parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Parameter name as written in configuration
    pub name: &'static str,
    /// Expected value type
    pub kind: ParamKind,
    /// Whether the parameter must be present
    pub required: bool,
}

impl ParamSpec {
    /// A required parameter.
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    /// An optional parameter.
    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// How many columns a check family targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnArity {
    /// Whole-table check; no column target allowed
    None,
    /// Exactly one column
    One,
    /// One or more columns
    OneOrMany,
}

/// An executable check implementation.
#[async_trait]
pub trait CheckExecutor: Debug + Send + Sync {
    /// The check family this executor implements.
    fn kind(&self) -> CheckKind;

    /// Column arity the check's target must satisfy.
    fn column_arity(&self) -> ColumnArity;

    /// Declared parameters, used for fail-fast validation at parse time.
    fn params(&self) -> &'static [ParamSpec];

    /// Evaluates the check against the run's execution context.
    async fn execute(&self, ctx: &ExecutionContext, spec: &CheckSpec) -> Result<CheckEvaluation>;

    /// Extra family-specific validation beyond arity and parameter typing.
    fn validate_extra(&self, _spec: &CheckSpec) -> Result<()> {
        Ok(())
    }

    /// Validates a check specification before execution: target arity,
    /// parameter presence and types, and family-specific constraints.
    fn validate_spec(&self, spec: &CheckSpec) -> Result<()> {
        if spec.column.is_some() && !spec.columns.is_empty() {
            return Err(SentinelError::configuration(
                "set either `column` or `columns`, not both",
            ));
        }
        let target = spec.target();
        match (self.column_arity(), &target) {
            (ColumnArity::None, CheckTarget::Table) => {}
            (ColumnArity::None, _) => {
                return Err(SentinelError::configuration(
                    "this check applies to the whole table and takes no column target",
                ));
            }
            (ColumnArity::One, CheckTarget::Column(_)) => {}
            (ColumnArity::One, _) => {
                return Err(SentinelError::configuration(
                    "this check requires exactly one `column`",
                ));
            }
            (ColumnArity::OneOrMany, CheckTarget::Column(_) | CheckTarget::Columns(_)) => {}
            (ColumnArity::OneOrMany, CheckTarget::Table) => {
                return Err(SentinelError::configuration(
                    "this check requires a `column` or `columns` target",
                ));
            }
        }
        for column in target.columns() {
            validate_identifier(column)?;
        }

        validate_params(spec.check_type.as_str(), &spec.params, self.params())?;

        if let Some(threshold) = spec.param_f64("threshold") {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(SentinelError::configuration(format!(
                    "threshold must be between 0.0 and 1.0, got {threshold}"
                )));
            }
        }

        self.validate_extra(spec)
    }
}

fn validate_params(
    check_type: &str,
    params: &BTreeMap<String, ParamValue>,
    declared: &[ParamSpec],
) -> Result<()> {
    for spec in declared {
        match params.get(spec.name) {
            Some(value) if !spec.kind.matches(value) => {
                return Err(SentinelError::configuration(format!(
                    "parameter '{}' must be a {}, got {}",
                    spec.name,
                    spec.kind.name(),
                    value.type_name()
                )));
            }
            None if spec.required => {
                return Err(SentinelError::configuration(format!(
                    "missing required parameter '{}'",
                    spec.name
                )));
            }
            _ => {}
        }
    }
    for name in params.keys() {
        if !declared.iter().any(|spec| spec.name == name) {
            return Err(SentinelError::configuration(format!(
                "unknown parameter '{name}' for check type '{check_type}'"
            )));
        }
    }
    Ok(())
}

/// Maps check-type identifiers to their executors. Built once at process
/// start; never mutated during a run.
#[derive(Debug)]
pub struct CheckRegistry {
    executors: BTreeMap<&'static str, Box<dyn CheckExecutor>>,
}

impl CheckRegistry {
    fn with_builtins() -> Self {
        let mut executors: BTreeMap<&'static str, Box<dyn CheckExecutor>> = BTreeMap::new();
        for executor in [
            Box::new(NotNullCheck) as Box<dyn CheckExecutor>,
            Box::new(RangeCheck),
            Box::new(UniqueCheck),
            Box::new(SchemaCheck),
            Box::new(ReferentialCheck),
            Box::new(ExpressionCheck),
        ] {
            executors.insert(executor.kind().id(), executor);
        }
        Self { executors }
    }

    /// Resolves a check-type identifier to its executor.
    pub fn resolve(&self, check_type: &str) -> Result<&dyn CheckExecutor> {
        self.executors
            .get(check_type)
            .map(|executor| executor.as_ref())
            .ok_or_else(|| {
                let known: Vec<&str> = self.executors.keys().copied().collect();
                SentinelError::configuration(format!(
                    "unknown check type '{check_type}' (known: {})",
                    known.join(", ")
                ))
            })
    }
}

static REGISTRY: Lazy<CheckRegistry> = Lazy::new(CheckRegistry::with_builtins);

/// The process-wide check registry.
pub fn registry() -> &'static CheckRegistry {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(check_type: &str) -> CheckSpec {
        CheckSpec {
            check_type: check_type.to_string(),
            column: None,
            columns: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    #[test]
    fn test_registry_resolves_all_builtins() {
        for id in ["not_null", "range", "unique", "schema", "referential", "expression"] {
            assert!(registry().resolve(id).is_ok(), "missing executor for {id}");
        }
    }

    #[test]
    fn test_registry_rejects_unknown() {
        let err = registry().resolve("telepathy").unwrap_err();
        assert!(matches!(err, SentinelError::Configuration { .. }));
        assert!(err.to_string().contains("telepathy"));
    }

    #[test]
    fn test_arity_validation() {
        // range requires exactly one column
        let executor = registry().resolve("range").unwrap();
        assert!(executor.validate_spec(&spec("range")).is_err());

        let mut with_column = spec("range");
        with_column.column = Some("amount".to_string());
        with_column
            .params
            .insert("min".to_string(), ParamValue::Int(0));
        assert!(executor.validate_spec(&with_column).is_ok());
    }

    #[test]
    fn test_column_and_columns_both_set_rejected() {
        let executor = registry().resolve("not_null").unwrap();
        let mut bad = spec("not_null");
        bad.column = Some("a".to_string());
        bad.columns = vec!["b".to_string()];
        let err = executor.validate_spec(&bad).unwrap_err();
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn test_unknown_param_rejected() {
        let executor = registry().resolve("not_null").unwrap();
        let mut bad = spec("not_null");
        bad.column = Some("a".to_string());
        bad.params
            .insert("thresold".to_string(), ParamValue::Float(0.9));
        let err = executor.validate_spec(&bad).unwrap_err();
        assert!(err.to_string().contains("thresold"));
    }

    #[test]
    fn test_param_type_mismatch_rejected() {
        let executor = registry().resolve("not_null").unwrap();
        let mut bad = spec("not_null");
        bad.column = Some("a".to_string());
        bad.params
            .insert("threshold".to_string(), ParamValue::Str("high".to_string()));
        let err = executor.validate_spec(&bad).unwrap_err();
        assert!(err.to_string().contains("must be a number"));
    }

    #[test]
    fn test_threshold_range_enforced() {
        let executor = registry().resolve("not_null").unwrap();
        let mut bad = spec("not_null");
        bad.column = Some("a".to_string());
        bad.params
            .insert("threshold".to_string(), ParamValue::Float(1.5));
        assert!(executor.validate_spec(&bad).is_err());
    }
}
