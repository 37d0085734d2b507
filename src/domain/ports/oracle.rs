//! Generation oracle port.
//!
//! Abstracts the backend that produces candidate tests (an LLM service or any
//! pluggable code-generation system). The core never depends on how
//! candidates are produced, only on this interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::models::{AttemptOutcome, CandidateTest};

/// A rejected attempt summarized for the oracle, so the backend can avoid
/// regenerating candidates that already failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAttemptContext {
    pub candidate_id: String,
    pub outcome: AttemptOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_summary: Option<String>,
}

/// Everything the oracle needs to generate the next candidate batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationContext {
    /// Path of the test file being extended, relative to the project root.
    pub test_file_path: String,
    /// Current content of the test file (including prior accepted candidates).
    pub test_file_text: String,
    /// Baseline coverage percentage at the time of the request.
    pub baseline_percentage: f64,
    /// Number of coverable lines still uncovered.
    pub uncovered_lines: usize,
    /// Recent rejections, bounded by configuration.
    #[serde(default)]
    pub failed_attempts: Vec<FailedAttemptContext>,
}

/// Error types for oracle operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle network error: {0}")]
    Network(String),

    #[error("Oracle authentication error: {0}")]
    Auth(String),

    #[error("Oracle rate limit or quota exceeded: {0}")]
    Quota(String),

    #[error("Oracle response could not be decoded: {0}")]
    Malformed(String),

    #[error("Oracle backend error: {0}")]
    Backend(String),
}

impl OracleError {
    /// Transient errors are worth retrying; the rest fail fast.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Quota(_) | Self::Backend(_))
    }
}

/// Port trait for candidate generation backends.
///
/// Implementations must be `Send + Sync`; the controller calls them from a
/// single task but shares them behind `Arc`.
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    /// Generate up to `batch_size` candidate tests for the given context.
    ///
    /// Returning fewer candidates than requested (including zero) is not an
    /// error — it means the backend had nothing more to propose this round.
    ///
    /// # Errors
    /// - `OracleError::Network` / `Quota` / `Backend` — transient
    ///   infrastructure failure, retried by the caller's policy
    /// - `OracleError::Auth` — permanent, surfaced immediately
    /// - `OracleError::Malformed` — backend replied but the payload failed
    ///   schema validation
    async fn generate(
        &self,
        context: &GenerationContext,
        batch_size: u32,
    ) -> Result<Vec<CandidateTest>, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(OracleError::Network("reset".into()).is_transient());
        assert!(OracleError::Quota("429".into()).is_transient());
        assert!(OracleError::Backend("500".into()).is_transient());
        assert!(!OracleError::Auth("401".into()).is_transient());
        assert!(!OracleError::Malformed("bad yaml".into()).is_transient());
    }
}
