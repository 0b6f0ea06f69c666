//! Sequential execution of a validated run configuration.
//!
//! The engine never fails a run call: every problem during execution is
//! recorded as an errored outcome and folded into the aggregated result.
//! Checks run strictly in declaration order; an errored check does not stop
//! the ones after it. Cancellation and the run deadline are the exceptions:
//! the in-flight check is recorded as errored and the remaining checks are
//! skipped, so the caller still gets a result covering everything that ran.

use super::aggregate::RunResult;
use super::context::ExecutionContext;
use super::result::CheckOutcome;
use crate::checks::registry;
use crate::config::RunConfig;
use crate::error::Result;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Format of the run timestamp used in artifact paths.
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Synthetic check-type label for outcomes the engine records itself.
const SOURCE_CHECK_TYPE: &str = "data_source";

enum Waited {
    Finished(Result<super::result::CheckEvaluation>),
    Cancelled,
    TimedOut,
}

/// Executes the checks of a run configuration against its data source.
#[derive(Debug, Default)]
pub struct ValidationEngine {
    timeout: Option<Duration>,
}

impl ValidationEngine {
    /// Creates an engine with no run deadline.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Creates an engine that abandons the run after the given wall-clock
    /// duration, recording the in-flight check as errored.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// Runs all checks and aggregates their outcomes.
    pub async fn run(&self, config: &RunConfig) -> RunResult {
        self.run_cancellable(config, CancellationToken::new()).await
    }

    /// Runs all checks, stopping early if the token is cancelled. The result
    /// covers every check that started before cancellation.
    pub async fn run_cancellable(
        &self,
        config: &RunConfig,
        token: CancellationToken,
    ) -> RunResult {
        let started_at = chrono::Utc::now();
        let run_timestamp = started_at.format(RUN_TIMESTAMP_FORMAT).to_string();
        let deadline = self.timeout.map(|t| Instant::now() + t);
        info!(
            run.name = %config.name,
            run.timestamp = %run_timestamp,
            checks.count = config.checks.len(),
            "Starting validation run"
        );

        let ctx = match ExecutionContext::open(&config.data_source).await {
            Ok(ctx) => ctx,
            Err(e) => {
                // With no reachable data source every check is moot; the run
                // carries a single synthetic outcome describing the failure.
                error!(error = %e, "Cannot open data source, skipping all checks");
                let outcome = CheckOutcome::errored(
                    SOURCE_CHECK_TYPE,
                    &config.data_source.location,
                    e.to_string(),
                    0,
                );
                return RunResult::finalize(
                    &config.name,
                    run_timestamp,
                    started_at,
                    chrono::Utc::now(),
                    vec![outcome],
                );
            }
        };

        let mut outcomes = Vec::with_capacity(config.checks.len());
        for (index, spec) in config.checks.iter().enumerate() {
            let target = spec.target().label();
            debug!(
                check.index = index,
                check.kind = %spec.check_type,
                check.target = %target,
                "Executing check"
            );
            let check_started = std::time::Instant::now();

            let executor = match registry().resolve(&spec.check_type) {
                Ok(executor) => executor,
                Err(e) => {
                    error!(check.kind = %spec.check_type, error = %e, "Unknown check type");
                    outcomes.push(CheckOutcome::errored(
                        &spec.check_type,
                        &target,
                        e.to_string(),
                        0,
                    ));
                    continue;
                }
            };

            let waited = Self::wait_for_check(
                executor.execute(&ctx, spec),
                &token,
                deadline,
            )
            .await;
            let duration_ms = check_started.elapsed().as_millis() as u64;

            match waited {
                Waited::Finished(Ok(evaluation)) => {
                    if evaluation.status.is_failed() {
                        warn!(
                            check.kind = %spec.check_type,
                            check.target = %target,
                            result.metric = ?evaluation.metric,
                            "Check failed"
                        );
                    }
                    outcomes.push(CheckOutcome::from_evaluation(
                        &spec.check_type,
                        &target,
                        evaluation,
                        duration_ms,
                    ));
                }
                Waited::Finished(Err(e)) => {
                    error!(
                        check.kind = %spec.check_type,
                        check.target = %target,
                        error = %e,
                        "Check errored"
                    );
                    outcomes.push(CheckOutcome::errored(
                        &spec.check_type,
                        &target,
                        e.to_string(),
                        duration_ms,
                    ));
                }
                Waited::Cancelled => {
                    warn!(check.kind = %spec.check_type, "Run cancelled mid-check");
                    outcomes.push(CheckOutcome::errored(
                        &spec.check_type,
                        &target,
                        "run cancelled while this check was executing",
                        duration_ms,
                    ));
                    break;
                }
                Waited::TimedOut => {
                    warn!(check.kind = %spec.check_type, "Run deadline exceeded mid-check");
                    outcomes.push(CheckOutcome::errored(
                        &spec.check_type,
                        &target,
                        "run deadline exceeded while this check was executing",
                        duration_ms,
                    ));
                    break;
                }
            }
        }
        ctx.close();

        RunResult::finalize(
            &config.name,
            run_timestamp,
            started_at,
            chrono::Utc::now(),
            outcomes,
        )
    }

    async fn wait_for_check<F>(
        execution: F,
        token: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Waited
    where
        F: std::future::Future<Output = Result<super::result::CheckEvaluation>>,
    {
        match deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Waited::Cancelled,
                    timed = tokio::time::timeout_at(deadline, execution) => match timed {
                        Ok(result) => Waited::Finished(result),
                        Err(_) => Waited::TimedOut,
                    },
                }
            }
            None => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Waited::Cancelled,
                    result = execution => Waited::Finished(result),
                }
            }
        }
    }
}
