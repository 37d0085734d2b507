//! Coverage domain model.
//!
//! A [`CoverageReport`] is an immutable snapshot of one coverage measurement.
//! Reports are never mutated after construction; each new measurement
//! supersedes the previous one.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::CoverageError;

/// Supported coverage report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageFormat {
    /// Cobertura-style XML with per-file `<line number hits>` entries.
    Cobertura,
    /// LCOV plain-text tracefile (`SF:` / `DA:` / `end_of_record`).
    Lcov,
}

impl Default for CoverageFormat {
    fn default() -> Self {
        Self::Cobertura
    }
}

impl CoverageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cobertura => "cobertura",
            Self::Lcov => "lcov",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cobertura" => Some(Self::Cobertura),
            "lcov" => Some(Self::Lcov),
            _ => None,
        }
    }
}

/// One coverage measurement over a unioned line-number space.
///
/// Line numbers are absolute positions assigned by the coverage processor
/// when it flattens per-file coverage into a single space. The invariant
/// `covered_lines ⊆ coverable_lines` is enforced at construction and holds
/// for the lifetime of the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Lines that were executed during the measured run.
    pub covered_lines: BTreeSet<u32>,
    /// Lines eligible to be counted by the coverage tool.
    pub coverable_lines: BTreeSet<u32>,
    /// `100 * |covered| / |coverable|`, or 0.0 when nothing is coverable.
    pub percentage: f64,
    /// When the measurement was taken.
    pub measured_at: DateTime<Utc>,
    /// Wall-clock duration of the test run that produced the report.
    pub duration_sec: f64,
}

impl CoverageReport {
    /// Build a report from raw line sets, computing the percentage.
    ///
    /// Fails if any covered line is not also coverable — that indicates
    /// inconsistent instrumentation in the source report.
    pub fn from_lines(
        covered_lines: BTreeSet<u32>,
        coverable_lines: BTreeSet<u32>,
        duration_sec: f64,
    ) -> Result<Self, CoverageError> {
        if let Some(stray) = covered_lines.difference(&coverable_lines).next() {
            return Err(CoverageError::Parse {
                reason: format!("covered line {stray} is not in the coverable set"),
            });
        }

        let percentage = Self::percentage_of(covered_lines.len(), coverable_lines.len());

        Ok(Self {
            covered_lines,
            coverable_lines,
            percentage,
            measured_at: Utc::now(),
            duration_sec,
        })
    }

    /// The percentage formula: 0 coverable lines is defined as 0%, not an error.
    fn percentage_of(covered: usize, coverable: usize) -> f64 {
        if coverable == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                100.0 * covered as f64 / coverable as f64
            }
        }
    }

    /// Number of lines covered here that the baseline did not cover.
    pub fn newly_covered(&self, baseline: &Self) -> usize {
        self.covered_lines.difference(&baseline.covered_lines).count()
    }

    /// True if every line the baseline covered is still covered here.
    pub fn retains_coverage_of(&self, baseline: &Self) -> bool {
        baseline.covered_lines.is_subset(&self.covered_lines)
    }

    /// True if the coverable-line count did not shrink relative to the baseline.
    ///
    /// A shrinking coverable set means the instrumented universe changed out
    /// from under the run, so a percentage comparison would be meaningless.
    pub fn retains_coverable_of(&self, baseline: &Self) -> bool {
        self.coverable_lines.len() >= baseline.coverable_lines.len()
    }
}

/// Acceptance policy for a passing candidate's coverage delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageGate {
    /// Require at least one newly covered line and no regression.
    StrictIncrease,
    /// Accept ties: require only that nothing regresses.
    NoRegression,
}

impl Default for CoverageGate {
    fn default() -> Self {
        Self::StrictIncrease
    }
}

impl CoverageGate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrictIncrease => "strict_increase",
            Self::NoRegression => "no_regression",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strict_increase" => Some(Self::StrictIncrease),
            "no_regression" => Some(Self::NoRegression),
            _ => None,
        }
    }

    /// Decide whether `after` clears this gate relative to `before`.
    pub fn accepts(&self, before: &CoverageReport, after: &CoverageReport) -> bool {
        let no_regression =
            after.retains_coverage_of(before) && after.retains_coverable_of(before);
        match self {
            Self::StrictIncrease => no_regression && after.newly_covered(before) > 0,
            Self::NoRegression => no_regression,
        }
    }
}
