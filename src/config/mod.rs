//! Typed configuration model for a validation run.
//!
//! A run is described by a YAML document with three top-level keys:
//! `data_source`, `checks`, and `outputs`. Parsing produces an immutable
//! [`RunConfig`] tree; all semantic validation (non-empty check list, known
//! check types, required parameters per check type) happens here, before any
//! execution context is opened. `${VAR}` placeholders are resolved against
//! the process environment at parse time, and an unset variable is a
//! configuration error.
//!
//! ```yaml
//! name: orders_quality
//! data_source:
//!   kind: csv
//!   location: data/orders.csv
//!   sample_fraction: 0.25
//! checks:
//!   - type: not_null
//!     column: order_id
//!   - type: range
//!     column: amount
//!     params: { min: 0, max: 10000 }
//! outputs:
//!   - name: archive
//!     kind: filesystem
//!     root: /var/dq
//!     base_path: "results/{timestamp}"
//! ```

use crate::checks::registry;
use crate::error::{Result, SentinelError};
use crate::security::{validate_identifier, SecretString};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// A typed check parameter value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    Str(String),
    /// List of strings
    List(Vec<String>),
}

impl ParamValue {
    /// Returns the value as a float if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a string list if it is one.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the value as a boolean if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Human-readable name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Float(_) => "number",
            ParamValue::Str(_) => "string",
            ParamValue::List(_) => "list",
        }
    }
}

/// The target a check applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckTarget {
    /// The whole table
    Table,
    /// A single column
    Column(String),
    /// A set of columns
    Columns(Vec<String>),
}

impl CheckTarget {
    /// Returns all column names in this target.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            CheckTarget::Table => Vec::new(),
            CheckTarget::Column(c) => vec![c.as_str()],
            CheckTarget::Columns(cs) => cs.iter().map(String::as_str).collect(),
        }
    }

    /// Human-readable label used in outcomes and reports.
    pub fn label(&self) -> String {
        match self {
            CheckTarget::Table => "table".to_string(),
            CheckTarget::Column(c) => c.clone(),
            CheckTarget::Columns(cs) => cs.join(", "),
        }
    }
}

/// One declared check: a type identifier, a target, and parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckSpec {
    /// The check-type identifier (e.g. `not_null`, `range`)
    #[serde(rename = "type")]
    pub check_type: String,
    /// Single-column target
    #[serde(default)]
    pub column: Option<String>,
    /// Multi-column target
    #[serde(default)]
    pub columns: Vec<String>,
    /// Check-specific parameters
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl CheckSpec {
    /// Returns the declared target of this check.
    pub fn target(&self) -> CheckTarget {
        if let Some(column) = &self.column {
            CheckTarget::Column(column.clone())
        } else if !self.columns.is_empty() {
            CheckTarget::Columns(self.columns.clone())
        } else {
            CheckTarget::Table
        }
    }

    /// Fetches a numeric parameter.
    pub fn param_f64(&self, name: &str) -> Option<f64> {
        self.params.get(name).and_then(ParamValue::as_f64)
    }

    /// Fetches a string parameter.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(ParamValue::as_str)
    }

    /// Fetches a string-list parameter.
    pub fn param_list(&self, name: &str) -> Option<&[String]> {
        self.params.get(name).and_then(ParamValue::as_list)
    }

    /// Returns the threshold parameter, defaulting to 1.0 (all rows).
    pub fn threshold(&self) -> f64 {
        self.param_f64("threshold").unwrap_or(1.0)
    }
}

/// Supported tabular file formats for the primary data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Comma-separated values with a header row
    Csv,
    /// Apache Parquet
    Parquet,
    /// Newline-delimited JSON
    Json,
}

/// An auxiliary table registered alongside the primary source, available to
/// referential checks under its configured name.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceTable {
    /// Table name the check refers to
    pub name: String,
    /// File format
    pub kind: SourceKind,
    /// File path
    pub location: String,
}

/// The data source descriptor for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceSpec {
    /// File format of the primary table
    pub kind: SourceKind,
    /// File path of the primary table
    pub location: String,
    /// Optional row-sample fraction in (0, 1]
    #[serde(default)]
    pub sample_fraction: Option<f64>,
    /// Reference tables for referential checks
    #[serde(default)]
    pub references: Vec<ReferenceTable>,
}

/// Storage backend for an output target.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreSpec {
    /// Local filesystem rooted at a directory
    Filesystem {
        /// Root directory for artifacts
        root: String,
    },
    /// In-memory store; useful in tests and dry runs
    Memory,
    /// Azure Blob / ADLS Gen2 (requires the `azure` feature)
    Azure {
        /// Storage account name
        account: String,
        /// Blob container name
        container: String,
        /// Storage account key, usually via `${VAR}` substitution
        access_key: SecretString,
    },
}

/// One named artifact destination.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputTarget {
    /// Target name, used in publish receipts
    pub name: String,
    /// Storage backend
    #[serde(flatten)]
    pub store: StoreSpec,
    /// Logical base path; may contain a `{timestamp}` placeholder. When the
    /// placeholder is absent the run timestamp is appended as a path segment.
    pub base_path: String,
}

/// The immutable, validated description of one validation run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Run name, used in reports and artifact metadata
    #[serde(default = "default_run_name")]
    pub name: String,
    /// Where the data lives
    pub data_source: DataSourceSpec,
    /// Ordered list of checks to execute
    pub checks: Vec<CheckSpec>,
    /// Artifact destinations
    #[serde(default)]
    pub outputs: Vec<OutputTarget>,
}

fn default_run_name() -> String {
    "validation_run".to_string()
}

static ENV_VAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("hard-coded regex is valid")
});

/// Replaces `${VAR}` placeholders using the given lookup. An unresolvable
/// placeholder is a configuration error.
pub fn substitute_env_with(
    raw: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    let mut missing: BTreeSet<String> = BTreeSet::new();
    let substituted = ENV_VAR_REGEX.replace_all(raw, |caps: &regex::Captures<'_>| {
        let var = &caps[1];
        match lookup(var) {
            Some(value) => value,
            None => {
                missing.insert(var.to_string());
                String::new()
            }
        }
    });
    if !missing.is_empty() {
        let names: Vec<String> = missing.into_iter().collect();
        return Err(SentinelError::configuration(format!(
            "unset environment variable(s) referenced in configuration: {}",
            names.join(", ")
        )));
    }
    Ok(substituted.into_owned())
}

/// Replaces `${VAR}` placeholders from the process environment.
pub fn substitute_env(raw: &str) -> Result<String> {
    substitute_env_with(raw, |var| std::env::var(var).ok())
}

impl RunConfig {
    /// Parses and validates a configuration from a YAML string.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let substituted = substitute_env(raw)?;
        let config: RunConfig = serde_yaml::from_str(&substituted)
            .map_err(|e| SentinelError::configuration(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration file. The run name defaults to
    /// the file stem when the document does not set one.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SentinelError::configuration(format!(
                "cannot read configuration file {}: {e}",
                path.display()
            ))
        })?;
        let mut config = Self::from_yaml_str(&raw)?;
        if config.name == default_run_name() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                config.name = stem.to_string();
            }
        }
        info!(
            config.path = %path.display(),
            run.name = %config.name,
            checks.count = config.checks.len(),
            outputs.count = config.outputs.len(),
            "Loaded run configuration"
        );
        Ok(config)
    }

    /// Validates semantic constraints. Called by the parse entry points;
    /// exposed for configs constructed programmatically.
    pub fn validate(&self) -> Result<()> {
        if self.data_source.location.trim().is_empty() {
            return Err(SentinelError::configuration(
                "data_source.location must not be empty",
            ));
        }
        if let Some(fraction) = self.data_source.sample_fraction {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(SentinelError::configuration(format!(
                    "data_source.sample_fraction must be in (0, 1], got {fraction}"
                )));
            }
        }
        for reference in &self.data_source.references {
            validate_identifier(&reference.name).map_err(|e| {
                SentinelError::configuration(format!("invalid reference table name: {e}"))
            })?;
            if reference.location.trim().is_empty() {
                return Err(SentinelError::configuration(format!(
                    "reference table '{}' has an empty location",
                    reference.name
                )));
            }
        }

        if self.checks.is_empty() {
            return Err(SentinelError::configuration(
                "configuration declares no checks",
            ));
        }
        for (index, spec) in self.checks.iter().enumerate() {
            let executor = registry().resolve(&spec.check_type).map_err(|e| {
                SentinelError::configuration(format!("check #{}: {e}", index + 1))
            })?;
            executor.validate_spec(spec).map_err(|e| {
                SentinelError::configuration(format!(
                    "check #{} ({}): {e}",
                    index + 1,
                    spec.check_type
                ))
            })?;
            debug!(
                check.index = index,
                check.kind = %spec.check_type,
                check.target = %spec.target().label(),
                "Validated check specification"
            );
        }

        let mut seen = BTreeSet::new();
        for target in &self.outputs {
            if target.name.trim().is_empty() {
                return Err(SentinelError::configuration(
                    "output target name must not be empty",
                ));
            }
            if !seen.insert(target.name.clone()) {
                return Err(SentinelError::configuration(format!(
                    "duplicate output target name '{}'",
                    target.name
                )));
            }
            if target.base_path.trim().is_empty() {
                return Err(SentinelError::configuration(format!(
                    "output target '{}' has an empty base_path",
                    target.name
                )));
            }
        }
        Ok(())
    }
}
