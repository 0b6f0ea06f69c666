//! Reduction of per-check outcomes into run-level results.
//!
//! Run status is derived with the precedence `errored > failed > passed`.
//! The pass rate excludes errored outcomes from its denominator: an errored
//! check is inconclusive about the data, not a failure of it.

use super::result::{CheckOutcome, OutcomeStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Derived status of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every outcome passed
    Passed,
    /// At least one outcome failed, none errored
    Failed,
    /// At least one outcome errored
    Errored,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
            RunStatus::Errored => "errored",
        };
        write!(f, "{label}")
    }
}

/// Summary statistics over a run's outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total number of recorded outcomes
    pub total: usize,
    /// Outcomes with status `passed`
    pub passed: usize,
    /// Outcomes with status `failed`
    pub failed: usize,
    /// Outcomes with status `errored`
    pub errored: usize,
    /// passed / (passed + failed); `None` when that denominator is zero
    pub pass_rate: Option<f64>,
}

impl RunSummary {
    /// Reduces outcomes to a run status and summary statistics.
    pub fn aggregate(outcomes: &[CheckOutcome]) -> (RunStatus, RunSummary) {
        let mut passed = 0usize;
        let mut failed = 0usize;
        let mut errored = 0usize;
        for outcome in outcomes {
            match outcome.status {
                OutcomeStatus::Passed => passed += 1,
                OutcomeStatus::Failed => failed += 1,
                OutcomeStatus::Errored => errored += 1,
            }
        }

        let status = if errored > 0 {
            RunStatus::Errored
        } else if failed > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Passed
        };

        let conclusive = passed + failed;
        let pass_rate = (conclusive > 0).then(|| passed as f64 / conclusive as f64);

        (
            status,
            RunSummary {
                total: outcomes.len(),
                passed,
                failed,
                errored,
                pass_rate,
            },
        )
    }
}

/// The complete, immutable result of one validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Name of the originating run configuration
    pub run_name: String,
    /// Run timestamp used in artifact paths (`%Y%m%dT%H%M%SZ`)
    pub run_timestamp: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Derived run-level status
    pub status: RunStatus,
    /// Summary statistics
    pub summary: RunSummary,
    /// Per-check outcomes in declaration order
    pub outcomes: Vec<CheckOutcome>,
}

impl RunResult {
    /// Aggregates outcomes into the final run result. This is the only way a
    /// `RunResult` is produced; it is never mutated afterwards.
    pub fn finalize(
        run_name: impl Into<String>,
        run_timestamp: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        outcomes: Vec<CheckOutcome>,
    ) -> Self {
        let (status, summary) = RunSummary::aggregate(&outcomes);
        let result = Self {
            run_name: run_name.into(),
            run_timestamp: run_timestamp.into(),
            started_at,
            finished_at,
            status,
            summary,
            outcomes,
        };
        info!(
            run.name = %result.run_name,
            run.status = %result.status,
            summary.total = result.summary.total,
            summary.passed = result.summary.passed,
            summary.failed = result.summary.failed,
            summary.errored = result.summary.errored,
            summary.pass_rate = ?result.summary.pass_rate,
            "Aggregated run result"
        );
        result
    }

    /// Serializes the result as the raw JSON artifact.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Returns true if the run passed.
    pub fn is_passed(&self) -> bool {
        self.status == RunStatus::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::result::CheckEvaluation;

    fn outcome(status: OutcomeStatus) -> CheckOutcome {
        let evaluation = match status {
            OutcomeStatus::Passed => CheckEvaluation::passed_with_metric(1.0),
            OutcomeStatus::Failed => CheckEvaluation::failed_with_metric(0.5, "failed"),
            OutcomeStatus::Errored => CheckEvaluation::errored("boom"),
        };
        CheckOutcome::from_evaluation("not_null", "col", evaluation, 1)
    }

    #[test]
    fn test_status_precedence() {
        use OutcomeStatus::*;
        let (status, _) = RunSummary::aggregate(&[outcome(Passed), outcome(Passed)]);
        assert_eq!(status, RunStatus::Passed);

        let (status, _) = RunSummary::aggregate(&[outcome(Passed), outcome(Failed)]);
        assert_eq!(status, RunStatus::Failed);

        let (status, _) =
            RunSummary::aggregate(&[outcome(Passed), outcome(Failed), outcome(Errored)]);
        assert_eq!(status, RunStatus::Errored);
    }

    #[test]
    fn test_pass_rate_excludes_errored() {
        use OutcomeStatus::*;
        let (_, summary) =
            RunSummary::aggregate(&[outcome(Passed), outcome(Failed), outcome(Errored)]);
        assert_eq!(summary.pass_rate, Some(0.5));
        assert_eq!(summary.total, 3);
        assert_eq!(summary.errored, 1);
    }

    #[test]
    fn test_pass_rate_undefined_when_all_errored() {
        let (status, summary) =
            RunSummary::aggregate(&[outcome(OutcomeStatus::Errored), outcome(OutcomeStatus::Errored)]);
        assert_eq!(status, RunStatus::Errored);
        assert_eq!(summary.pass_rate, None);
    }

    #[test]
    fn test_pass_rate_serialized_as_null() {
        let result = RunResult::finalize(
            "run",
            "20260101T000000Z",
            Utc::now(),
            Utc::now(),
            vec![outcome(OutcomeStatus::Errored)],
        );
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["summary"]["pass_rate"].is_null());
        assert_eq!(json["status"], "errored");
    }
}
