//! Implementation of the `covlift init` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::fs;

use crate::cli::output::{output, CommandOutput};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        if self.success {
            format!(
                "{}\n\nEdit {} to point at your project's test command and coverage reports.",
                self.message,
                self.config_path.display()
            )
        } else {
            self.message.clone()
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

const CONFIG_TEMPLATE: &str = r#"# covlift configuration
#
# Values omitted here fall back to built-in defaults; environment variables
# prefixed COVLIFT_ (e.g. COVLIFT_GOAL__DESIRED_COVERAGE) override everything.

project:
  # Test file that accepted candidates are spliced into.
  test_file: tests/test_app.py
  # Command that runs the suite and writes the coverage report(s).
  test_command: pytest --cov=app --cov-report=xml --timeout=30
  test_command_dir: .
  # One entry per module for multi-module suites; unioned per measurement.
  report_paths:
    - coverage.xml
  # cobertura or lcov
  coverage_format: cobertura

goal:
  desired_coverage: 80.0
  max_iterations: 5
  max_run_time_sec: 1800
  max_tests_per_run: 4
  # strict_increase rejects passing tests that cover nothing new;
  # no_regression accepts them.
  coverage_gate: strict_increase

runner:
  timeout_sec: 300

oracle:
  endpoint: http://localhost:8700/v1/generate

ledger:
  path: .covlift/attempts.db

logging:
  level: info
  format: pretty
"#;

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let covlift_dir = target.join(".covlift");
    let config_path = covlift_dir.join("config.yaml");

    if config_path.exists() && !args.force {
        let data = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to overwrite the config."
                .to_string(),
            config_path,
        };
        output(&data, json_mode);
        return Ok(());
    }

    fs::create_dir_all(&covlift_dir)
        .await
        .context("Failed to create .covlift directory")?;
    fs::write(&config_path, CONFIG_TEMPLATE)
        .await
        .context("Failed to write config template")?;

    let data = InitOutput {
        success: true,
        message: format!("Initialized covlift in {}", target.display()),
        config_path,
    };
    output(&data, json_mode);
    Ok(())
}
