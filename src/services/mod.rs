//! Core services: the coverage processor, insertion resolver, candidate
//! validator, and iteration controller.

pub mod candidate_validator;
pub mod coverage_processor;
pub mod insertion_resolver;
pub mod iteration_controller;

pub use candidate_validator::{
    splice, syntactic_precheck, CandidateValidator, FatalReason, TestFileHandle,
    ValidationOutcome, ValidatorSettings,
};
pub use coverage_processor::CoverageProcessor;
pub use insertion_resolver::InsertionResolver;
pub use iteration_controller::{ControllerSettings, IterationController, RunReport};
