//! Implementation of the `covlift run` command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;

use crate::application::RunCoordinator;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, CoverageFormat, RunStatus};
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Load configuration from a specific file instead of .covlift/
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Target coverage percentage
    #[arg(long)]
    pub desired_coverage: Option<f64>,

    /// Maximum iterations of the generate-validate loop
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Wall-clock budget for the whole run, in seconds
    #[arg(long)]
    pub max_run_time_sec: Option<u64>,

    /// Test command override
    #[arg(long)]
    pub test_command: Option<String>,

    /// Test file override
    #[arg(long)]
    pub test_file: Option<String>,

    /// Coverage report path(s); repeat for multi-module suites
    #[arg(long = "report-path")]
    pub report_paths: Vec<String>,

    /// Coverage report format: cobertura or lcov
    #[arg(long)]
    pub coverage_format: Option<String>,

    /// Exit nonzero when the target coverage is not reached
    #[arg(long)]
    pub strict_coverage: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct RunOutput {
    pub status: String,
    pub baseline_percentage: f64,
    pub final_percentage: f64,
    pub accepted: u32,
    pub attempts: usize,
    pub iterations: u32,
    pub elapsed_sec: f64,
    pub test_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Run finished: {}", self.status),
            format!(
                "Coverage: {:.2}% -> {:.2}%",
                self.baseline_percentage, self.final_percentage
            ),
            format!(
                "Accepted {} of {} attempted candidate(s) over {} iteration(s) in {:.1}s",
                self.accepted, self.attempts, self.iterations, self.elapsed_sec
            ),
            format!("Test file: {}", self.test_file),
        ];
        if let Some(reason) = &self.failure_reason {
            lines.push(format!("Failure reason: {reason}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Merge CLI overrides into the loaded configuration.
fn apply_overrides(config: &mut Config, args: &RunArgs) -> Result<()> {
    if let Some(v) = args.desired_coverage {
        config.goal.desired_coverage = v;
    }
    if let Some(v) = args.max_iterations {
        config.goal.max_iterations = v;
    }
    if let Some(v) = args.max_run_time_sec {
        config.goal.max_run_time_sec = v;
    }
    if let Some(v) = &args.test_command {
        config.project.test_command = v.clone();
    }
    if let Some(v) = &args.test_file {
        config.project.test_file = v.clone();
    }
    if !args.report_paths.is_empty() {
        config.project.report_paths = args.report_paths.clone();
    }
    if let Some(v) = &args.coverage_format {
        config.project.coverage_format = match CoverageFormat::from_str(v) {
            Some(format) => format,
            None => bail!("unknown coverage format '{v}'; expected cobertura or lcov"),
        };
    }
    if args.strict_coverage {
        config.goal.strict_coverage = true;
    }
    Ok(())
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

pub async fn execute(args: RunArgs, json_mode: bool) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;
    ConfigLoader::validate(&config)?;

    let strict = config.goal.strict_coverage;
    let test_file = config.project.test_file.clone();
    let summary = RunCoordinator::new(config).execute().await?;

    let status = summary.report.state.status;
    let data = RunOutput {
        status: status.as_str().to_string(),
        baseline_percentage: summary.baseline_percentage,
        final_percentage: summary.report.state.baseline_coverage.percentage,
        accepted: summary.report.state.accepted_count,
        attempts: summary.attempts.len(),
        iterations: summary.report.state.iteration,
        elapsed_sec: summary.report.state.elapsed_sec,
        test_file,
        failure_reason: summary.report.failure_reason.clone(),
    };
    output(&data, json_mode);

    match status {
        RunStatus::Failed => std::process::exit(2),
        RunStatus::Partial | RunStatus::Exhausted if strict => std::process::exit(3),
        _ => Ok(()),
    }
}
