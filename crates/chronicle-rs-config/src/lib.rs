//! Configuration models and loading for Chronicle memory.
//!
//! This crate owns the memory config schema, its validation, and JSON5
//! loading used when wiring the storage and retrieval services.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Configuration schema models.
pub use model::*;
