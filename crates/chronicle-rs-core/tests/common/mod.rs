//! Shared helpers for core integration tests.

#![allow(dead_code)]

use chronicle_rs_core::{MemoryEvent, MemoryEventMsg, MemoryObserver};
use chronicle_rs_memory::GameTime;
use parking_lot::Mutex;
use std::sync::Arc;

/// Observer that keeps every event it receives.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<MemoryEventMsg>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn payloads(&self) -> Vec<MemoryEvent> {
        self.events
            .lock()
            .iter()
            .map(|event| event.payload.clone())
            .collect()
    }

    /// Event type names in arrival order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.payloads()
            .iter()
            .map(|payload| match payload {
                MemoryEvent::Rejected { .. } => "rejected",
                MemoryEvent::CallStarted { .. } => "call_started",
                MemoryEvent::StoreCompleted { .. } => "store_completed",
                MemoryEvent::QueryCompleted { .. } => "query_completed",
                MemoryEvent::CallFailed { .. } => "call_failed",
            })
            .collect()
    }
}

impl MemoryObserver for RecordingObserver {
    fn on_event(&self, event: &MemoryEventMsg) {
        self.events.lock().push(event.clone());
    }
}

pub fn day(value: i64) -> GameTime {
    GameTime::new(value, "Day")
}
