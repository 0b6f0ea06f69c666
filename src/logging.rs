//! Structured logging setup for dq-sentinel.
//!
//! All components log through the `tracing` crate with structured key-value
//! fields. This module provides the subscriber configuration used by the CLI;
//! library consumers can install their own subscriber instead.

use tracing::Level;

/// Configuration for the tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base log level for the application
    pub level: Level,
    /// Log level for dq-sentinel components specifically
    pub sentinel_level: Level,
    /// Whether to emit JSON-formatted log lines
    pub json_format: bool,
    /// Environment filter override; takes precedence over the level fields
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            sentinel_level: Level::INFO,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Configuration for production use: warnings only, JSON output.
    pub fn production() -> Self {
        Self {
            level: Level::WARN,
            sentinel_level: Level::INFO,
            json_format: true,
            env_filter: None,
        }
    }

    /// Sets whether to use JSON output format.
    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    /// Sets a custom environment filter.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the environment filter string.
    pub fn env_filter(&self) -> String {
        if let Some(ref filter) = self.env_filter {
            filter.clone()
        } else {
            format!(
                "{},dq_sentinel={}",
                self.level.as_str().to_lowercase(),
                self.sentinel_level.as_str().to_lowercase()
            )
        }
    }
}

/// Initializes the global tracing subscriber.
///
/// The `RUST_LOG` environment variable takes precedence over the configured
/// levels when set.
pub fn init_logging(config: LoggingConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
