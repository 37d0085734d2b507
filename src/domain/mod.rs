//! Domain layer: models, errors, and port traits. No I/O.

pub mod error;
pub mod models;
pub mod ports;
