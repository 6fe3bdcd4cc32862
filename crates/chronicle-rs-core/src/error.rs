//! Error types for the core memory services crate.

use chronicle_rs_config::ConfigError;
use chronicle_rs_memory::MemoryError;
use thiserror::Error;

/// Errors returned while assembling the memory services.
///
/// Store and query operations never return this type: their only error arm
/// is [`chronicle_rs_memory::ValidationError`].
#[derive(Debug, Error)]
pub enum ChronicleCoreError {
    /// Configuration could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Backend construction failed.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// The configured api key variable is not set.
    #[error("api key environment variable `{0}` is not set")]
    MissingApiKey(String),
    /// The file provider has no root directory to write to.
    #[error("no memory path configured and no platform data dir available")]
    MissingPath,
}
