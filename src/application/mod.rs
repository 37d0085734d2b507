//! Application layer: use-case wiring between the CLI and the core services.

pub mod coordinator;

pub use coordinator::{RunCoordinator, RunSummary};
