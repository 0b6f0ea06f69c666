//! Error types for the dq-sentinel validation engine.
//!
//! The taxonomy follows the run lifecycle: configuration errors abort before
//! any resource is acquired, connection errors fail the whole run as a single
//! errored outcome, check execution errors are isolated per check, and storage
//! errors are collected per artifact without changing the run status.

use thiserror::Error;

/// Errors produced by the validation engine and its collaborators.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Malformed or invalid configuration. Fails before any execution.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The data source could not be opened. Fails the whole run.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// A single check failed at query time. Captured as an errored outcome;
    /// the run continues.
    #[error("Check execution error: {message}")]
    CheckExecution { message: String },

    /// An artifact could not be published. Reported per artifact.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Backend query error from the underlying dataset engine.
    #[error("Backend error: {0}")]
    Backend(#[from] datafusion::error::DataFusionError),

    /// I/O error reading local files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant violation inside the engine itself.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SentinelError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a check execution error.
    pub fn check_execution(message: impl Into<String>) -> Self {
        Self::CheckExecution {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Returns true if this error aborts the run before any check executes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SentinelError::Configuration { .. } | SentinelError::Connection { .. }
        )
    }
}

impl From<object_store::Error> for SentinelError {
    fn from(err: object_store::Error) -> Self {
        SentinelError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SentinelError {
    fn from(err: serde_json::Error) -> Self {
        SentinelError::Internal(format!("serialization failed: {err}"))
    }
}

/// Result type for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, SentinelError>;
