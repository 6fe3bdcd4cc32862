//! Storage and retrieval services for Chronicle's roleplay memory.
//!
//! The services write formatted records into per-character and per-world
//! containers and recall them before the next reply. Bad input is reported
//! as a validation error; backend trouble degrades to a failed or empty
//! result so a conversation never stalls on memory.

mod boundary;
pub mod error;
pub mod observer;
pub mod retrieval;
pub mod services;
pub mod storage;

pub use boundary::CallState;
pub use error::ChronicleCoreError;
/// Debug events and observers.
pub use observer::{MemoryEvent, MemoryEventMsg, MemoryObserver, MemoryOperation};
/// Recall queries.
pub use retrieval::{
    CharacterMemoryQuery, DEFAULT_CHARACTER_LIMIT, DEFAULT_WORLD_LIMIT, MemoryQueryResult,
    RecentMessage, RetrievalService, WorldMemoryQuery,
};
/// Config-driven construction.
pub use services::{MemoryServices, backend_from_config};
/// Writes and per-turn fan-out.
pub use storage::{
    CharacterMessage, InitializationContent, ParticipantOutcome, StorageService, StoreOutcome,
    TurnEvent, TurnParticipant, TurnStoreReport, WorldMessage, WorldStateUpdate,
};
