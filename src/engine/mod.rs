//! Run orchestration: execution context, check scheduling, and aggregation.

pub mod aggregate;
pub mod context;
pub mod result;
pub mod runner;

pub use aggregate::{RunResult, RunStatus, RunSummary};
pub use context::ExecutionContext;
pub use result::{CheckEvaluation, CheckOutcome, OutcomeStatus};
pub use runner::ValidationEngine;
