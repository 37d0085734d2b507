//! Attempt ledger port.
//!
//! The ledger is the durable, append-only record of every validation attempt
//! and the sole source of truth for resumability and reporting. It is never
//! rewritten, only appended.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::models::AttemptRecord;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger storage error: {0}")]
    Storage(String),

    #[error("Ledger record could not be encoded or decoded: {0}")]
    Codec(String),
}

/// Port trait for the durable attempt ledger.
///
/// `append` must be durable before it returns: a crash after append but
/// before the next validation must not lose or duplicate the record.
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    /// Append one record. Called exactly once per attempt, after the attempt
    /// reaches a terminal state.
    async fn append(&self, record: AttemptRecord) -> Result<(), LedgerError>;

    /// All records in append order (insertion order = attempt order).
    async fn read_all(&self) -> Result<Vec<AttemptRecord>, LedgerError>;
}

/// In-memory ledger for unit tests and dry runs. Not durable.
#[derive(Default)]
pub struct InMemoryLedger {
    records: Mutex<Vec<AttemptRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptLedger for InMemoryLedger {
    async fn append(&self, record: AttemptRecord) -> Result<(), LedgerError> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<AttemptRecord>, LedgerError> {
        Ok(self.records.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AttemptOutcome, CoverageReport};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn record(candidate_id: &str) -> AttemptRecord {
        let coverage =
            CoverageReport::from_lines(BTreeSet::new(), BTreeSet::new(), 0.0).expect("empty");
        AttemptRecord {
            candidate_id: candidate_id.into(),
            insertion_point: None,
            outcome: AttemptOutcome::Error,
            coverage_before: coverage,
            coverage_after: None,
            runner_exit_code: None,
            runner_duration_sec: 0.0,
            failure_summary: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_ledger_preserves_append_order() {
        let ledger = InMemoryLedger::new();
        ledger.append(record("a")).await.expect("append a");
        ledger.append(record("b")).await.expect("append b");
        ledger.append(record("c")).await.expect("append c");

        let all = ledger.read_all().await.expect("read");
        let ids: Vec<_> = all.iter().map(|r| r.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
