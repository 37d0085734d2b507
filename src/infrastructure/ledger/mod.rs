//! Attempt ledger adapters.

pub mod sqlite;

pub use sqlite::SqliteLedger;
