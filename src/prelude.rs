//! Convenience re-exports for typical embedding use.

pub use crate::config::{CheckSpec, DataSourceSpec, OutputTarget, RunConfig, StoreSpec};
pub use crate::engine::{
    CheckOutcome, OutcomeStatus, RunResult, RunStatus, RunSummary, ValidationEngine,
};
pub use crate::error::{Result, SentinelError};
pub use crate::publish::{ArtifactPublisher, PublishReport};
