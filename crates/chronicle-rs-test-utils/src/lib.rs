//! Test helpers shared across Chronicle crates.

pub mod backend;

pub use backend::{FailingBackend, InMemoryBackend, PanickingBackend, StoredEntry};
