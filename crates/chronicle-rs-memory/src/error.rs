//! Error types for memory operations.

/// Input rejected before any backend call is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Container tag does not belong to the expected namespace.
    #[error("invalid container tag `{tag}`: {reason}")]
    InvalidContainerTag { tag: String, reason: String },
    /// A field required by the content type is absent or empty.
    #[error("missing required field `{field}` for {content_type} content")]
    MissingRequiredField {
        content_type: &'static str,
        field: &'static str,
    },
    /// Content type is not accepted by the operation.
    #[error("content type `{content_type}` is not valid for {operation}")]
    InvalidContentType {
        content_type: &'static str,
        operation: &'static str,
    },
}

/// Failures raised by a memory backend while talking to its store.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Network or transport failure, including timeouts.
    #[error("transport error: {0}")]
    Transport(String),
    /// Backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// Backend answered with a body that could not be decoded.
    #[error("malformed backend response: {0}")]
    Malformed(String),
    /// Memory is unavailable because the application is offline.
    #[error("memory backend is offline")]
    Offline,
    /// IO error from a local backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error from a local backend.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors returned by memory helpers that may fail for either reason.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Input validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Backend construction or access failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        MemoryError::Backend(BackendError::Io(err))
    }
}
