//! Identifier hygiene and credential handling.
//!
//! Column and table names come from user configuration and are interpolated
//! into SQL sent to the dataset backend, so they are validated and escaped
//! here before any query is built. Storage credentials are held in a
//! zeroizing wrapper so they never outlive the run in memory.

use crate::error::{Result, SentinelError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use zeroize::ZeroizeOnDrop;

/// A credential string that clears its contents when dropped and redacts
/// itself in debug output.
#[derive(Clone, Deserialize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretString(***)")
    }
}

impl SecretString {
    /// Creates a new secret string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Exposes the secret value. Avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Must start with a letter or underscore; letters, digits, and
    // underscores after that. Hard-coded pattern, known valid.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("hard-coded regex is valid")
});

/// Validates a SQL identifier (column or table name) from configuration.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        return Err(SentinelError::configuration(
            "SQL identifier cannot be empty",
        ));
    }
    if identifier.len() > 128 {
        return Err(SentinelError::configuration(format!(
            "SQL identifier '{}' too long (max 128 characters)",
            &identifier[..32]
        )));
    }
    if identifier.contains('\0') {
        return Err(SentinelError::configuration(
            "SQL identifier cannot contain null bytes",
        ));
    }
    if !IDENTIFIER_REGEX.is_match(identifier) {
        return Err(SentinelError::configuration(format!(
            "invalid SQL identifier '{identifier}': identifiers must start with a letter \
             or underscore and contain only letters, digits, and underscores"
        )));
    }
    Ok(())
}

/// Validates an identifier and returns it double-quoted for SQL use.
pub fn escape_identifier(identifier: &str) -> Result<String> {
    validate_identifier(identifier)?;
    Ok(format!("\"{identifier}\""))
}

/// Validates a user-supplied SQL expression used by expression checks.
///
/// Expression checks exist to run arbitrary predicates, so this only rejects
/// inputs that can break out of the enclosing SELECT: statement separators,
/// comments, and oversized payloads.
pub fn validate_sql_expression(expression: &str) -> Result<()> {
    if expression.trim().is_empty() {
        return Err(SentinelError::configuration(
            "SQL expression cannot be empty",
        ));
    }
    if expression.len() > 5000 {
        return Err(SentinelError::configuration(
            "SQL expression too long (max 5000 characters)",
        ));
    }
    if expression.contains('\0') {
        return Err(SentinelError::configuration(
            "SQL expression cannot contain null bytes",
        ));
    }
    for forbidden in [";", "--", "/*"] {
        if expression.contains(forbidden) {
            return Err(SentinelError::configuration(format!(
                "SQL expression may not contain '{forbidden}'"
            )));
        }
    }
    Ok(())
}
