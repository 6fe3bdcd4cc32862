//! Error boundary around backend calls.
//!
//! Each call moves `Idle -> Calling -> {Success, Failed}`. A failed call,
//! whether the backend returned an error or panicked, resolves to `None`
//! so the services can hand back their failed/empty result. Validation
//! problems never reach this point.

use crate::observer::{MemoryEvent, MemoryObserver, MemoryOperation, emit};
use chronicle_rs_memory::{BackendError, ValidationError};
use futures_util::FutureExt;
use log::{debug, warn};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Lifecycle of a single guarded backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Calling,
    Success,
    Failed,
}

impl CallState {
    /// Next state given the call's outcome; terminal states stay put.
    fn advance(self, succeeded: Option<bool>) -> Self {
        match (self, succeeded) {
            (CallState::Idle, _) => CallState::Calling,
            (CallState::Calling, Some(true)) => CallState::Success,
            (CallState::Calling, Some(false)) => CallState::Failed,
            (state, _) => state,
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct ErrorBoundary {
    observer: Option<Arc<dyn MemoryObserver>>,
}

impl ErrorBoundary {
    pub(crate) fn new(observer: Option<Arc<dyn MemoryObserver>>) -> Self {
        Self { observer }
    }

    pub(crate) fn observer(&self) -> Option<&Arc<dyn MemoryObserver>> {
        self.observer.as_ref()
    }

    /// Record a validation failure and hand it back unchanged.
    pub(crate) fn reject(
        &self,
        operation: MemoryOperation,
        container_tag: &str,
        error: ValidationError,
    ) -> ValidationError {
        warn!(
            "memory input rejected (operation={}, container={}, error={})",
            operation.as_str(),
            container_tag,
            error
        );
        emit(
            self.observer(),
            MemoryEvent::Rejected {
                operation,
                container_tag: container_tag.to_string(),
                reason: error.to_string(),
            },
        );
        error
    }

    /// Drive `call` to completion, converting any failure into `None`.
    pub(crate) async fn run<T, F>(
        &self,
        operation: MemoryOperation,
        container_tag: &str,
        call: F,
    ) -> Option<T>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let mut state = CallState::Idle.advance(None);
        debug!(
            "memory call (operation={}, container={}, state={:?})",
            operation.as_str(),
            container_tag,
            state
        );
        emit(
            self.observer(),
            MemoryEvent::CallStarted {
                operation,
                container_tag: container_tag.to_string(),
            },
        );

        let outcome = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result.map_err(|err| err.to_string()),
            Err(panic) => Err(format!("backend panicked: {}", panic_message(&*panic))),
        };
        state = state.advance(Some(outcome.is_ok()));
        match outcome {
            Ok(value) => {
                debug!(
                    "memory call (operation={}, container={}, state={:?})",
                    operation.as_str(),
                    container_tag,
                    state
                );
                Some(value)
            }
            Err(error) => {
                warn!(
                    "memory call degraded (operation={}, container={}, state={:?}, error={})",
                    operation.as_str(),
                    container_tag,
                    state,
                    error
                );
                emit(
                    self.observer(),
                    MemoryEvent::CallFailed {
                        operation,
                        container_tag: container_tag.to_string(),
                        error,
                    },
                );
                None
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn state_machine_reaches_terminal_states() {
        let calling = CallState::Idle.advance(None);
        assert_eq!(calling, CallState::Calling);
        assert_eq!(calling.advance(Some(true)), CallState::Success);
        assert_eq!(calling.advance(Some(false)), CallState::Failed);
        assert_eq!(CallState::Failed.advance(Some(true)), CallState::Failed);
        assert_eq!(CallState::Success.advance(Some(false)), CallState::Success);
    }

    #[tokio::test]
    async fn errors_degrade_to_none() {
        let boundary = ErrorBoundary::default();
        let result: Option<u8> = boundary
            .run(MemoryOperation::QueryWorldMemories, "s-world", async {
                Err(BackendError::Offline)
            })
            .await;
        assert_eq!(result, None);
    }

    async fn explode() -> Result<u8, BackendError> {
        panic!("boom")
    }

    #[tokio::test]
    async fn panics_degrade_to_none() {
        let boundary = ErrorBoundary::default();
        let result = boundary
            .run(MemoryOperation::StoreWorldMessage, "s-world", explode())
            .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn success_passes_value_through() {
        let boundary = ErrorBoundary::default();
        let result = boundary
            .run(MemoryOperation::StoreWorldMessage, "s-world", async {
                Ok::<_, BackendError>(7)
            })
            .await;
        assert_eq!(result, Some(7));
    }
}
