//! SQLite attempt ledger.
//!
//! One append-only `attempts` table; each append is a single committed
//! INSERT, so a crash between attempts can never lose or duplicate a record.
//! Read order is rowid order, which equals append order.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::Row;
use tracing::debug;

use crate::domain::models::AttemptRecord;
use crate::domain::ports::{AttemptLedger, LedgerError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    candidate_id TEXT NOT NULL,
    insertion_point TEXT,
    outcome TEXT NOT NULL,
    coverage_before TEXT NOT NULL,
    coverage_after TEXT,
    runner_exit_code INTEGER,
    runner_duration_sec REAL NOT NULL,
    failure_summary TEXT,
    timestamp TEXT NOT NULL
)
";

/// Durable SQLite implementation of the attempt ledger.
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path`.
    ///
    /// WAL journal mode with synchronous=NORMAL: committed inserts survive a
    /// process crash, which is the durability level `append` promises.
    pub async fn connect(path: &str) -> Result<Self, LedgerError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| LedgerError::Storage(format!("cannot create {parent:?}: {e}")))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))
            .map_err(|e| LedgerError::Storage(format!("invalid ledger path '{path}': {e}")))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| LedgerError::Storage(format!("failed to open ledger: {e}")))?;

        let ledger = Self { pool };
        ledger.init_schema().await?;
        Ok(ledger)
    }

    /// In-memory ledger for tests. A single connection keeps the database
    /// alive and shared.
    pub async fn in_memory() -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| LedgerError::Storage(format!("failed to open ledger: {e}")))?;

        let ledger = Self { pool };
        ledger.init_schema().await?;
        Ok(ledger)
    }

    async fn init_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::Storage(format!("failed to create schema: {e}")))?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRecord, LedgerError> {
        let codec = |e: serde_json::Error| LedgerError::Codec(e.to_string());

        let insertion_point = row
            .get::<Option<String>, _>("insertion_point")
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(codec)?;
        let coverage_before =
            serde_json::from_str(&row.get::<String, _>("coverage_before")).map_err(codec)?;
        let coverage_after = row
            .get::<Option<String>, _>("coverage_after")
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(codec)?;

        let outcome_raw = row.get::<String, _>("outcome");
        let outcome = crate::domain::models::AttemptOutcome::from_str(&outcome_raw)
            .ok_or_else(|| LedgerError::Codec(format!("unknown outcome '{outcome_raw}'")))?;

        let timestamp_raw = row.get::<String, _>("timestamp");
        let timestamp = DateTime::parse_from_rfc3339(&timestamp_raw)
            .map_err(|e| LedgerError::Codec(format!("bad timestamp '{timestamp_raw}': {e}")))?
            .with_timezone(&chrono::Utc);

        Ok(AttemptRecord {
            candidate_id: row.get("candidate_id"),
            insertion_point,
            outcome,
            coverage_before,
            coverage_after,
            runner_exit_code: row
                .get::<Option<i64>, _>("runner_exit_code")
                .map(|v| i32::try_from(v).unwrap_or(i32::MAX)),
            runner_duration_sec: row.get("runner_duration_sec"),
            failure_summary: row.get("failure_summary"),
            timestamp,
        })
    }
}

#[async_trait]
impl AttemptLedger for SqliteLedger {
    async fn append(&self, record: AttemptRecord) -> Result<(), LedgerError> {
        let codec = |e: serde_json::Error| LedgerError::Codec(e.to_string());

        let insertion_point = record
            .insertion_point
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(codec)?;
        let coverage_before = serde_json::to_string(&record.coverage_before).map_err(codec)?;
        let coverage_after = record
            .coverage_after
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(codec)?;

        sqlx::query(
            "INSERT INTO attempts (
                candidate_id, insertion_point, outcome, coverage_before,
                coverage_after, runner_exit_code, runner_duration_sec,
                failure_summary, timestamp
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.candidate_id)
        .bind(insertion_point)
        .bind(record.outcome.as_str())
        .bind(coverage_before)
        .bind(coverage_after)
        .bind(record.runner_exit_code.map(i64::from))
        .bind(record.runner_duration_sec)
        .bind(&record.failure_summary)
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Storage(format!("append failed: {e}")))?;

        debug!(candidate_id = %record.candidate_id, outcome = record.outcome.as_str(), "Attempt recorded");
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<AttemptRecord>, LedgerError> {
        let rows = sqlx::query("SELECT * FROM attempts ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LedgerError::Storage(format!("read failed: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }
}
