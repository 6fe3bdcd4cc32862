//! Debug events emitted by the storage and retrieval services.
//!
//! Observers are passed in at construction; nothing is recorded globally.

use chronicle_rs_memory::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Service operation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOperation {
    StoreWorldMessage,
    StoreCharacterMessage,
    StoreInitializationContent,
    StoreWorldStateUpdate,
    QueryCharacterMemories,
    QueryWorldMemories,
}

impl MemoryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryOperation::StoreWorldMessage => "store_world_message",
            MemoryOperation::StoreCharacterMessage => "store_character_message",
            MemoryOperation::StoreInitializationContent => "store_initialization_content",
            MemoryOperation::StoreWorldStateUpdate => "store_world_state_update",
            MemoryOperation::QueryCharacterMemories => "query_character_memories",
            MemoryOperation::QueryWorldMemories => "query_world_memories",
        }
    }
}

/// Wrapper for events delivered to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEventMsg {
    /// Unique id for the event.
    pub id: Uuid,
    /// Timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// Event payload content.
    pub payload: MemoryEvent,
}

/// All events emitted by the memory services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum MemoryEvent {
    /// Input failed validation; no backend call was made.
    Rejected {
        operation: MemoryOperation,
        container_tag: String,
        reason: String,
    },
    /// Backend call started.
    CallStarted {
        operation: MemoryOperation,
        container_tag: String,
    },
    /// Record written.
    StoreCompleted {
        operation: MemoryOperation,
        container_tag: String,
        id: String,
        content: String,
        metadata: Metadata,
    },
    /// Query answered.
    QueryCompleted {
        operation: MemoryOperation,
        container_tag: String,
        query: String,
        memories: Vec<String>,
    },
    /// Backend call failed and was degraded.
    CallFailed {
        operation: MemoryOperation,
        container_tag: String,
        error: String,
    },
}

/// Receiver for memory debug events.
pub trait MemoryObserver: Send + Sync {
    fn on_event(&self, event: &MemoryEventMsg);
}

impl<F> MemoryObserver for F
where
    F: Fn(&MemoryEventMsg) + Send + Sync,
{
    fn on_event(&self, event: &MemoryEventMsg) {
        self(event)
    }
}

/// Deliver `payload` to `observer` if one is attached.
pub(crate) fn emit(observer: Option<&Arc<dyn MemoryObserver>>, payload: MemoryEvent) {
    if let Some(observer) = observer {
        observer.on_event(&MemoryEventMsg {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            payload,
        });
    }
}
