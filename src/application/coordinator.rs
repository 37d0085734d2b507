//! Run coordination.
//!
//! Owns startup wiring: adapters are constructed from validated
//! configuration, the baseline is measured (fatal on failure — a broken
//! baseline means no later measurement can be trusted), and the iteration
//! controller is handed ownership of the loop. The final state, the full
//! attempt sequence, and the final test-file content are returned for the
//! host to render.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::domain::models::{AttemptRecord, Config, CoverageReport};
use crate::domain::ports::{AttemptLedger, TestRunner};
use crate::infrastructure::ledger::SqliteLedger;
use crate::infrastructure::oracle::HttpOracle;
use crate::infrastructure::runner::ShellRunner;
use crate::services::{
    CandidateValidator, ControllerSettings, CoverageProcessor, InsertionResolver,
    IterationController, RunReport, TestFileHandle, ValidatorSettings,
};

/// Everything the host needs to render the outcome of a run.
pub struct RunSummary {
    pub report: RunReport,
    /// Coverage percentage measured before the first candidate.
    pub baseline_percentage: f64,
    /// Attempts made by this run, in order. The ledger itself also holds
    /// records from earlier runs against the same project.
    pub attempts: Vec<AttemptRecord>,
    /// Content of the test file after the run (baseline plus every accepted
    /// candidate).
    pub final_test_file: String,
}

/// Wires adapters to the core and drives one full run.
pub struct RunCoordinator {
    config: Config,
}

impl RunCoordinator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the suite once and parse the resulting coverage artifacts.
    ///
    /// Any failure here is fatal to a run: a baseline that cannot be
    /// measured means the environment cannot produce trustworthy numbers.
    pub async fn measure_baseline(&self) -> Result<CoverageReport> {
        let runner = ShellRunner::new();
        let processor = self.processor();
        let project = &self.config.project;

        info!(command = %project.test_command, "Measuring baseline coverage");
        let started = SystemTime::now();
        let output = runner
            .run(
                &project.test_command,
                &project.test_command_dir,
                Duration::from_secs(self.config.runner.timeout_sec),
            )
            .await
            .context("baseline test run could not be launched")?;

        if output.timed_out {
            bail!(
                "baseline test run exceeded the {}s timeout",
                self.config.runner.timeout_sec
            );
        }
        if output.exit_code != Some(0) {
            bail!(
                "baseline test suite is failing (exit code {:?}); fix the suite before generating tests:\n{}",
                output.exit_code,
                AttemptRecord::summarize_failure(&output.combined_output())
            );
        }

        let baseline = processor
            .parse(&project.report_paths, output.duration_sec, Some(started))
            .context("baseline coverage report could not be parsed")?;

        info!(
            percentage = baseline.percentage,
            coverable = baseline.coverable_lines.len(),
            "Baseline measured"
        );
        Ok(baseline)
    }

    /// Execute the full generate-validate loop.
    pub async fn execute(&self) -> Result<RunSummary> {
        let baseline = self.measure_baseline().await?;
        let baseline_percentage = baseline.percentage;

        let ledger: Arc<dyn AttemptLedger> = Arc::new(
            SqliteLedger::connect(&self.config.ledger.path)
                .await
                .context("attempt ledger could not be opened")?,
        );
        let prior_attempts = ledger
            .read_all()
            .await
            .context("attempt ledger could not be read")?
            .len();
        let oracle =
            Arc::new(HttpOracle::new(&self.config.oracle).context("oracle adapter")?);

        let validator = CandidateValidator::new(
            Arc::new(ShellRunner::new()),
            Arc::new(self.processor()),
            InsertionResolver::new(self.config.resolver.clone()),
            ValidatorSettings {
                test_command: self.config.project.test_command.clone(),
                test_command_dir: self.config.project.test_command_dir.clone(),
                report_paths: self.config.project.report_paths.clone(),
                run_timeout: Duration::from_secs(self.config.runner.timeout_sec),
                runs_per_candidate: self.config.goal.runs_per_candidate,
                coverage_gate: self.config.goal.coverage_gate,
            },
        );

        let controller = IterationController::new(
            oracle,
            validator,
            Arc::clone(&ledger),
            ControllerSettings {
                desired_coverage: self.config.goal.desired_coverage,
                max_iterations: self.config.goal.max_iterations,
                max_run_time: Duration::from_secs(self.config.goal.max_run_time_sec),
                max_tests_per_run: self.config.goal.max_tests_per_run,
                failed_attempts_in_context: self.config.oracle.failed_attempts_in_context,
                test_file_path: self.config.project.test_file.clone(),
            },
        );

        let test_file = TestFileHandle::new(&self.config.project.test_file);
        let report = controller.run(&test_file, baseline).await;

        let mut attempts = ledger
            .read_all()
            .await
            .context("attempt ledger could not be read back")?;
        let attempts = attempts.split_off(prior_attempts.min(attempts.len()));
        let final_test_file = test_file
            .read()
            .context("final test file could not be read")?;

        Ok(RunSummary {
            report,
            baseline_percentage,
            attempts,
            final_test_file,
        })
    }

    fn processor(&self) -> CoverageProcessor {
        CoverageProcessor::new(
            self.config.project.coverage_format,
            self.config.project.file_filter.clone(),
        )
    }
}
