//! Domain models.

pub mod attempt;
pub mod candidate;
pub mod config;
pub mod coverage;
pub mod run;

pub use attempt::{AttemptOutcome, AttemptRecord};
pub use candidate::{CandidateTest, InsertionHint, InsertionPoint};
pub use config::{
    Config, GoalConfig, LedgerConfig, LoggingConfig, OracleConfig, ProjectConfig, ResolverConfig,
    RetryConfig, RunnerConfig,
};
pub use coverage::{CoverageFormat, CoverageGate, CoverageReport};
pub use run::{IterationState, RunStatus, RunVerdict};
