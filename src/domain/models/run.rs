//! Run state domain model.
//!
//! [`IterationState`] is owned exclusively by the iteration controller and
//! mutated only at iteration boundaries, never mid-validation.

use serde::{Deserialize, Serialize};

use super::coverage::CoverageReport;

/// Overall status of a coverage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The iteration loop is still executing.
    Running,
    /// Desired coverage threshold reached.
    Succeeded,
    /// Budget exhausted with some acceptances and improved coverage, but the
    /// target was not reached.
    Partial,
    /// Budget exhausted without qualifying progress.
    Exhausted,
    /// Environment or oracle failure aborted the run.
    Failed,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Running
    }
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Partial => "partial",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "partial" => Some(Self::Partial),
            "exhausted" => Some(Self::Exhausted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Classification of one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunVerdict {
    /// Exit code 0 and no failure markers in the output.
    Passed,
    /// Nonzero exit or assertion failure markers in output.
    Failed,
    /// Exceeded the per-run timeout; the child was killed.
    TimedOut,
    /// The runner itself could not execute the command.
    Crashed,
}

/// Mutable state of the iteration loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationState {
    /// Last accepted coverage measurement.
    pub baseline_coverage: CoverageReport,
    /// Candidates accepted so far.
    pub accepted_count: u32,
    /// Completed iterations.
    pub iteration: u32,
    /// Wall-clock seconds elapsed since the run started.
    pub elapsed_sec: f64,
    /// Current status; `Running` until a stop condition fires.
    pub status: RunStatus,
}

impl IterationState {
    /// Fresh state around a measured baseline.
    pub fn new(baseline_coverage: CoverageReport) -> Self {
        Self {
            baseline_coverage,
            accepted_count: 0,
            iteration: 0,
            elapsed_sec: 0.0,
            status: RunStatus::Running,
        }
    }
}
