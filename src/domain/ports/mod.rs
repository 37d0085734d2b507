//! Port traits for external collaborators.
//!
//! The core consumes these interfaces; infrastructure provides the adapters.

pub mod ledger;
pub mod oracle;
pub mod runner;

pub use ledger::{AttemptLedger, InMemoryLedger, LedgerError};
pub use oracle::{FailedAttemptContext, GenerationContext, GenerationOracle, OracleError};
pub use runner::{RunOutput, RunnerError, TestRunner};
