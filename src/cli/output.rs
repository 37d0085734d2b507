//! CLI output helpers.
//!
//! Every command produces a value implementing [`CommandOutput`], rendered
//! as human text or JSON depending on the global `--json` flag.

use tracing::error;

/// Renderable command result.
pub trait CommandOutput {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

/// Print a command result in the selected mode.
pub fn output(data: &impl CommandOutput, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&data.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", data.to_human());
    }
}

/// Report a command error and exit nonzero.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    error!(error = %err, "Command failed");
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
