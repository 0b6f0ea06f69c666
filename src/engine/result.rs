//! Outcome types produced by check execution.

use serde::{Deserialize, Serialize};

/// The status of one executed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The check passed
    Passed,
    /// The check failed against the data
    Failed,
    /// The check could not be evaluated (backend or query error)
    Errored,
}

impl OutcomeStatus {
    /// Returns true for a passed outcome.
    pub fn is_passed(&self) -> bool {
        matches!(self, OutcomeStatus::Passed)
    }

    /// Returns true for a failed outcome.
    pub fn is_failed(&self) -> bool {
        matches!(self, OutcomeStatus::Failed)
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OutcomeStatus::Passed => "passed",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Errored => "errored",
        };
        write!(f, "{label}")
    }
}

/// The raw verdict returned by a check executor, before the engine attaches
/// check identity and timing.
#[derive(Debug, Clone)]
pub struct CheckEvaluation {
    /// Pass/fail verdict
    pub status: OutcomeStatus,
    /// Observed metric value (ratio, count) where one applies
    pub metric: Option<f64>,
    /// Free-form diagnostic detail (failing-row examples, counts)
    pub detail: Option<String>,
}

impl CheckEvaluation {
    /// Creates a passing evaluation with a metric.
    pub fn passed_with_metric(metric: f64) -> Self {
        Self {
            status: OutcomeStatus::Passed,
            metric: Some(metric),
            detail: None,
        }
    }

    /// Creates a passing evaluation that was vacuously satisfied.
    pub fn passed_vacuous(detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Passed,
            metric: None,
            detail: Some(detail.into()),
        }
    }

    /// Creates a failing evaluation with a metric and diagnostic detail.
    pub fn failed_with_metric(metric: f64, detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            metric: Some(metric),
            detail: Some(detail.into()),
        }
    }

    /// Creates an errored evaluation.
    pub fn errored(detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Errored,
            metric: None,
            detail: Some(detail.into()),
        }
    }
}

/// The result of one executed check, immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// The check-type identifier from the configuration
    pub check_type: String,
    /// Human-readable target label (column names or `table`)
    pub target: String,
    /// Pass/fail verdict
    pub status: OutcomeStatus,
    /// Observed metric value where one applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<f64>,
    /// Diagnostic detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Wall-clock execution time of this check
    pub duration_ms: u64,
}

impl CheckOutcome {
    /// Builds an outcome from an executor evaluation plus check identity.
    pub fn from_evaluation(
        check_type: impl Into<String>,
        target: impl Into<String>,
        evaluation: CheckEvaluation,
        duration_ms: u64,
    ) -> Self {
        Self {
            check_type: check_type.into(),
            target: target.into(),
            status: evaluation.status,
            metric: evaluation.metric,
            detail: evaluation.detail,
            duration_ms,
        }
    }

    /// Builds an errored outcome directly, used for connection failures,
    /// cancellation, and executor errors.
    pub fn errored(
        check_type: impl Into<String>,
        target: impl Into<String>,
        detail: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self::from_evaluation(check_type, target, CheckEvaluation::errored(detail), duration_ms)
    }
}
