//! Top-level iteration loop.
//!
//! The controller owns the [`IterationState`] and the test-file handle for
//! the lifetime of a run. Each iteration requests a bounded candidate batch
//! from the oracle, validates candidates strictly sequentially (the test file
//! is a single shared resource), appends every attempt to the ledger, and
//! re-evaluates the continuation policy at the iteration boundary.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use crate::domain::models::{CandidateTest, CoverageReport, IterationState, RunStatus};
use crate::domain::ports::{
    AttemptLedger, FailedAttemptContext, GenerationContext, GenerationOracle,
};
use crate::services::candidate_validator::{
    syntactic_precheck, CandidateValidator, FatalReason, TestFileHandle,
};

/// Budget and goal settings for the loop.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub desired_coverage: f64,
    pub max_iterations: u32,
    pub max_run_time: Duration,
    pub max_tests_per_run: u32,
    /// How many recent rejections are carried in the generation context.
    pub failed_attempts_in_context: usize,
    /// Test file path as shown to the oracle.
    pub test_file_path: String,
}

/// Final result of a run: the terminal state plus a distinguishing reason
/// when the run failed, so the host can present actionable diagnostics.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: IterationState,
    pub failure_reason: Option<String>,
}

/// Drives the generate-validate loop to a terminal status.
pub struct IterationController {
    oracle: Arc<dyn GenerationOracle>,
    validator: CandidateValidator,
    ledger: Arc<dyn AttemptLedger>,
    settings: ControllerSettings,
}

impl IterationController {
    pub fn new(
        oracle: Arc<dyn GenerationOracle>,
        validator: CandidateValidator,
        ledger: Arc<dyn AttemptLedger>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            oracle,
            validator,
            ledger,
            settings,
        }
    }

    /// Run the loop to completion. Always terminates within
    /// `max_iterations` iterations and `max_run_time` wall time.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        test_file: &TestFileHandle,
        baseline: CoverageReport,
    ) -> RunReport {
        let initial_percentage = baseline.percentage;
        let mut state = IterationState::new(baseline);
        let mut failure_reason: Option<String> = None;
        let started = Instant::now();

        let mut recent_failures: VecDeque<FailedAttemptContext> =
            VecDeque::with_capacity(self.settings.failed_attempts_in_context);

        info!(
            baseline = initial_percentage,
            target = self.settings.desired_coverage,
            "Starting coverage run"
        );

        while state.status == RunStatus::Running {
            let batch = match self.request_batch(test_file, &state, &recent_failures).await {
                Ok(batch) => batch,
                Err(reason) => {
                    error!(reason = %reason, "Oracle failed beyond its retry budget");
                    state.status = RunStatus::Failed;
                    failure_reason = Some(reason);
                    break;
                }
            };

            // Pre-checks are read-only and safe to evaluate concurrently;
            // everything that touches the file below stays serialized.
            let prechecks = futures::future::join_all(
                batch
                    .iter()
                    .map(|candidate| async move { syntactic_precheck(candidate).err() }),
            )
            .await;

            for (candidate, precheck) in batch.iter().zip(prechecks) {
                let outcome = match self
                    .validator
                    .validate(test_file, &state.baseline_coverage, candidate, precheck)
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(io_err) => {
                        error!(error = %io_err, "Test file became inaccessible mid-run");
                        state.status = RunStatus::Failed;
                        failure_reason =
                            Some(format!("test file could not be read or restored: {io_err}"));
                        break;
                    }
                };

                if let Err(err) = self.ledger.append(outcome.record.clone()).await {
                    // Losing ledger durability invalidates resumability;
                    // treat it like any other broken-environment failure.
                    error!(error = %err, "Ledger append failed");
                    state.status = RunStatus::Failed;
                    failure_reason = Some(format!("attempt ledger unavailable: {err}"));
                    break;
                }

                if let Some(new_baseline) = outcome.new_baseline {
                    state.baseline_coverage = new_baseline;
                    state.accepted_count += 1;
                } else {
                    if recent_failures.len() >= self.settings.failed_attempts_in_context {
                        recent_failures.pop_front();
                    }
                    recent_failures.push_back(FailedAttemptContext {
                        candidate_id: outcome.record.candidate_id.clone(),
                        outcome: outcome.record.outcome,
                        failure_summary: outcome.record.failure_summary.clone(),
                    });
                }

                if let Some(FatalReason::RunnerInfrastructure(reason)) = outcome.fatal {
                    error!(reason = %reason, "Runner environment is broken; aborting run");
                    state.status = RunStatus::Failed;
                    failure_reason = Some(format!("test runner cannot execute: {reason}"));
                    break;
                }
            }

            state.iteration += 1;
            state.elapsed_sec = started.elapsed().as_secs_f64();

            if state.status == RunStatus::Running {
                state.status = self.continuation(&state, initial_percentage);
            }

            info!(
                iteration = state.iteration,
                coverage = state.baseline_coverage.percentage,
                accepted = state.accepted_count,
                status = state.status.as_str(),
                "Iteration complete"
            );
        }

        state.elapsed_sec = started.elapsed().as_secs_f64();
        RunReport {
            state,
            failure_reason,
        }
    }

    /// Continuation policy, evaluated at iteration boundaries only.
    fn continuation(&self, state: &IterationState, initial_percentage: f64) -> RunStatus {
        if state.baseline_coverage.percentage >= self.settings.desired_coverage {
            return RunStatus::Succeeded;
        }

        let out_of_iterations = state.iteration >= self.settings.max_iterations;
        let out_of_time = state.elapsed_sec >= self.settings.max_run_time.as_secs_f64();
        if out_of_iterations || out_of_time {
            // Exhaustion with real progress is partial success.
            if state.accepted_count > 0
                && state.baseline_coverage.percentage > initial_percentage
            {
                return RunStatus::Partial;
            }
            return RunStatus::Exhausted;
        }

        RunStatus::Running
    }

    /// Build the generation context and request one candidate batch.
    ///
    /// Oracle retry happens inside the adapter; an error here means the
    /// configured budget is already spent.
    async fn request_batch(
        &self,
        test_file: &TestFileHandle,
        state: &IterationState,
        recent_failures: &VecDeque<FailedAttemptContext>,
    ) -> Result<Vec<CandidateTest>, String> {
        let test_file_text = test_file
            .read()
            .map_err(|e| format!("test file could not be read: {e}"))?;

        let context = GenerationContext {
            test_file_path: self.settings.test_file_path.clone(),
            test_file_text,
            baseline_percentage: state.baseline_coverage.percentage,
            uncovered_lines: state
                .baseline_coverage
                .coverable_lines
                .difference(&state.baseline_coverage.covered_lines)
                .count(),
            failed_attempts: recent_failures.iter().cloned().collect(),
        };

        let mut batch = self
            .oracle
            .generate(&context, self.settings.max_tests_per_run)
            .await
            .map_err(|e| e.to_string())?;

        // The batch size is a hard bound even if the backend over-delivers.
        if batch.len() > self.settings.max_tests_per_run as usize {
            warn!(
                delivered = batch.len(),
                bound = self.settings.max_tests_per_run,
                "Oracle over-delivered; truncating batch"
            );
            batch.truncate(self.settings.max_tests_per_run as usize);
        }

        Ok(batch)
    }
}
