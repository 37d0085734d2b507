//! Attempt record domain model.
//!
//! Every candidate validation produces exactly one [`AttemptRecord`], appended
//! to the durable ledger. Records are self-contained so a partial run can be
//! reconstructed from the ledger alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidate::InsertionPoint;
use super::coverage::CoverageReport;

/// Terminal outcome of one validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Suite passed and the coverage gate was cleared; candidate kept.
    Accepted,
    /// Candidate was syntactically malformed or failed to build.
    RejectedCompile,
    /// Suite ran but reported failures.
    RejectedFail,
    /// Suite passed but the coverage gate was not cleared.
    RejectedNoGain,
    /// Suite exceeded the per-run timeout and was killed.
    RejectedTimeout,
    /// Attempt could not be carried out (unresolvable insertion point,
    /// unreadable coverage artifacts, ...); candidate skipped.
    Error,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::RejectedCompile => "rejected_compile",
            Self::RejectedFail => "rejected_fail",
            Self::RejectedNoGain => "rejected_no_gain",
            Self::RejectedTimeout => "rejected_timeout",
            Self::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "accepted" => Some(Self::Accepted),
            "rejected_compile" => Some(Self::RejectedCompile),
            "rejected_fail" => Some(Self::RejectedFail),
            "rejected_no_gain" => Some(Self::RejectedNoGain),
            "rejected_timeout" => Some(Self::RejectedTimeout),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// True if the candidate was kept in the test file.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Durable record of one validation attempt.
///
/// Written exactly once, after the attempt reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Identifier of the validated candidate.
    pub candidate_id: String,
    /// The resolved insertion point, when resolution succeeded.
    pub insertion_point: Option<InsertionPoint>,
    /// Terminal outcome.
    pub outcome: AttemptOutcome,
    /// Baseline coverage at the time the candidate was applied.
    pub coverage_before: CoverageReport,
    /// Coverage measured after a passing run, when one happened.
    pub coverage_after: Option<CoverageReport>,
    /// Exit code of the last runner invocation, when the run was launched.
    pub runner_exit_code: Option<i32>,
    /// Wall-clock duration of the runner invocation(s).
    pub runner_duration_sec: f64,
    /// Truncated tail of runner output for rejected attempts, fed back to
    /// the oracle as context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_summary: Option<String>,
    /// When the record was written.
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    /// Maximum characters of runner output retained in `failure_summary`.
    pub const FAILURE_SUMMARY_LIMIT: usize = 2000;

    /// Truncate runner output to a bounded failure summary.
    ///
    /// Keeps the tail of the output, where test runners put their verdicts.
    pub fn summarize_failure(output: &str) -> String {
        let trimmed = output.trim();
        let count = trimmed.chars().count();
        if count <= Self::FAILURE_SUMMARY_LIMIT {
            return trimmed.to_string();
        }
        let tail: String = trimmed
            .chars()
            .skip(count - Self::FAILURE_SUMMARY_LIMIT)
            .collect();
        format!("… {tail}")
    }
}
