//! Shell test-runner adapter.
//!
//! Runs the configured test command through `sh -c` in the project directory,
//! captures output, and enforces the per-run timeout by killing the child on
//! expiry. Timeout is a reported outcome; only failure to launch is an error.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::ports::{RunOutput, RunnerError, TestRunner};

/// Executes test commands as child shell processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TestRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        working_dir: &str,
        run_timeout: Duration,
    ) -> Result<RunOutput, RunnerError> {
        debug!(command = %command, dir = %working_dir, "Launching test command");
        let started = Instant::now();

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RunnerError::Infrastructure(format!("failed to spawn '{command}': {e}"))
            })?;

        match timeout(run_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let duration_sec = started.elapsed().as_secs_f64();
                debug!(
                    exit_code = ?output.status.code(),
                    duration_sec,
                    "Test command finished"
                );
                Ok(RunOutput {
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    duration_sec,
                    timed_out: false,
                })
            }
            Ok(Err(e)) => Err(RunnerError::Infrastructure(format!(
                "failed to collect output of '{command}': {e}"
            ))),
            Err(_elapsed) => {
                // The child is killed by kill_on_drop when the future holding
                // it is dropped on timeout.
                warn!(
                    command = %command,
                    timeout_sec = run_timeout.as_secs(),
                    "Test command timed out; child killed"
                );
                Ok(RunOutput {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: format!(
                        "test command timed out after {}s and was killed",
                        run_timeout.as_secs()
                    ),
                    duration_sec: started.elapsed().as_secs_f64(),
                    timed_out: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_exit_code_and_stdout() {
        let runner = ShellRunner::new();
        let output = runner
            .run("echo hello && exit 0", ".", Duration::from_secs(10))
            .await
            .expect("run");

        assert_eq!(output.exit_code, Some(0));
        assert!(output.stdout.contains("hello"));
        assert!(!output.timed_out);
    }

    #[tokio::test]
    async fn reports_nonzero_exit() {
        let runner = ShellRunner::new();
        let output = runner
            .run("echo boom >&2; exit 3", ".", Duration::from_secs(10))
            .await
            .expect("run");

        assert_eq!(output.exit_code, Some(3));
        assert!(output.stderr.contains("boom"));
    }

    #[tokio::test]
    async fn times_out_and_kills_the_child() {
        let runner = ShellRunner::new();
        let started = Instant::now();
        let output = runner
            .run("sleep 30", ".", Duration::from_millis(200))
            .await
            .expect("run");

        assert!(output.timed_out);
        assert_eq!(output.exit_code, None);
        // The timeout fired, not the sleep finishing.
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn unlaunchable_directory_is_infrastructure_error() {
        let runner = ShellRunner::new();
        let result = runner
            .run("true", "/nonexistent/directory/for/covlift", Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(RunnerError::Infrastructure(_))));
    }
}
