//! Subprocess test runner port.
//!
//! The runner executes the project's test command under a timeout and
//! reports what happened. Timeouts are an expected outcome, not an error;
//! only failure to launch at all is an error.

use std::time::Duration;

use async_trait::async_trait;

/// Captured result of one test-command invocation.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Process exit code; `None` when the run timed out and was killed.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock duration of the invocation.
    pub duration_sec: f64,
    /// True when the timeout expired and the child was forcibly terminated.
    pub timed_out: bool,
}

impl RunOutput {
    /// Combined stdout and stderr, stdout first.
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Error types for runner operations.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The command could not be launched at all — the environment is broken
    /// and no measurement from it can be trusted.
    #[error("Test command could not be launched: {0}")]
    Infrastructure(String),
}

/// Port trait for test-command execution.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run `command` in `working_dir`, bounded by `timeout`.
    ///
    /// A run that exceeds the timeout returns `Ok` with `timed_out = true`
    /// after the child has been killed; `Err` is reserved for launch failure.
    async fn run(
        &self,
        command: &str,
        working_dir: &str,
        timeout: Duration,
    ) -> Result<RunOutput, RunnerError>;
}
