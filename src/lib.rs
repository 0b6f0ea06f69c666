//! # dq-sentinel
//!
//! A declarative data-quality validation runner. A YAML configuration names a
//! tabular data source, an ordered list of checks, and a set of output
//! targets; the engine executes every check against the data, aggregates the
//! outcomes into a run-level verdict, and publishes a JSON result plus an
//! HTML report to object storage.
//!
//! ```no_run
//! use dq_sentinel::prelude::*;
//!
//! # async fn demo() -> Result<()> {
//! let config = RunConfig::from_yaml_file("checks/orders.yaml")?;
//! let result = ValidationEngine::new().run(&config).await;
//! let receipt = ArtifactPublisher::new().publish(&result, &config.outputs).await;
//! println!("{}: {} artifacts published", result.status, receipt.published.len());
//! # Ok(())
//! # }
//! ```
//!
//! Checks are isolated: a check that fails or errors never stops the ones
//! after it, and a run always produces a complete [`engine::RunResult`].
//! Publishing is best-effort and never changes the validation verdict.

pub mod checks;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod publish;
pub mod security;

#[cfg(test)]
pub(crate) mod test_support;
