//! Implementation of the `covlift attempts` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::cli::commands::run::load_config;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::AttemptRecord;
use crate::domain::ports::AttemptLedger;
use crate::infrastructure::ledger::SqliteLedger;

#[derive(Args, Debug)]
pub struct AttemptsArgs {
    /// Load configuration from a specific file instead of .covlift/
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum number of attempts to display (most recent last)
    #[arg(short, long, default_value = "50")]
    pub limit: usize,
}

#[derive(Debug)]
pub struct AttemptsOutput {
    pub total: usize,
    pub shown: Vec<AttemptRecord>,
}

impl CommandOutput for AttemptsOutput {
    fn to_human(&self) -> String {
        if self.shown.is_empty() {
            return "No attempts recorded yet.".to_string();
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                "candidate", "outcome", "before %", "after %", "exit", "runtime", "when",
            ]);

        for record in &self.shown {
            table.add_row(vec![
                Cell::new(&record.candidate_id),
                Cell::new(record.outcome.as_str()),
                Cell::new(format!("{:.2}", record.coverage_before.percentage)),
                Cell::new(
                    record
                        .coverage_after
                        .as_ref()
                        .map_or_else(|| "-".to_string(), |c| format!("{:.2}", c.percentage)),
                ),
                Cell::new(
                    record
                        .runner_exit_code
                        .map_or_else(|| "-".to_string(), |c| c.to_string()),
                ),
                Cell::new(format!("{:.1}s", record.runner_duration_sec)),
                Cell::new(record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            ]);
        }

        format!(
            "{table}\nShowing {} of {} attempt(s)",
            self.shown.len(),
            self.total
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "total": self.total,
            "attempts": self.shown,
        })
    }
}

pub async fn execute(args: AttemptsArgs, json_mode: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    let ledger = SqliteLedger::connect(&config.ledger.path)
        .await
        .context("attempt ledger could not be opened")?;
    let all = ledger.read_all().await.context("ledger read failed")?;

    let total = all.len();
    let start = total.saturating_sub(args.limit);
    let data = AttemptsOutput {
        total,
        shown: all[start..].to_vec(),
    };
    output(&data, json_mode);
    Ok(())
}
