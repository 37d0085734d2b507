//! Covlift - Coverage-Driven Test Generation
//!
//! Covlift raises a project's test coverage by iteratively asking a
//! generation oracle for candidate tests, validating each candidate against
//! a real test run, and keeping only candidates that demonstrably increase
//! coverage without breaking the suite.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors, and port traits
//! - **Service Layer** (`services`): The core engine — coverage processor,
//!   insertion resolver, candidate validator, iteration controller
//! - **Infrastructure Layer** (`infrastructure`): Config, SQLite ledger,
//!   HTTP oracle, subprocess runner
//! - **Application Layer** (`application`): Use-case wiring
//! - **CLI Layer** (`cli`): Command-line interface

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{RunCoordinator, RunSummary};
pub use domain::models::{
    AttemptOutcome, AttemptRecord, CandidateTest, Config, CoverageFormat, CoverageGate,
    CoverageReport, InsertionHint, InsertionPoint, IterationState, RunStatus,
};
pub use domain::ports::{AttemptLedger, GenerationContext, GenerationOracle, TestRunner};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    CandidateValidator, CoverageProcessor, InsertionResolver, IterationController,
};
