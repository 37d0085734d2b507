//! Implementation of the `covlift baseline` command.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::application::RunCoordinator;
use crate::cli::commands::run::load_config;
use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct BaselineArgs {
    /// Load configuration from a specific file instead of .covlift/
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, serde::Serialize)]
pub struct BaselineOutput {
    pub percentage: f64,
    pub covered_lines: usize,
    pub coverable_lines: usize,
    pub duration_sec: f64,
}

impl CommandOutput for BaselineOutput {
    fn to_human(&self) -> String {
        format!(
            "Baseline coverage: {:.2}% ({} of {} coverable lines, suite ran {:.1}s)",
            self.percentage, self.covered_lines, self.coverable_lines, self.duration_sec
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: BaselineArgs, json_mode: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    ConfigLoader::validate(&config)?;

    let baseline = RunCoordinator::new(config).measure_baseline().await?;

    let data = BaselineOutput {
        percentage: baseline.percentage,
        covered_lines: baseline.covered_lines.len(),
        coverable_lines: baseline.coverable_lines.len(),
        duration_sec: baseline.duration_sec,
    };
    output(&data, json_mode);
    Ok(())
}
