//! Memory records, formatting, and backends for Chronicle.

pub mod backend;
pub mod container;
pub mod error;
pub mod filter;
pub mod format;
pub mod metadata;

/// Backend interface, wire types, and implementations.
pub use backend::{
    DisabledBackend, FileMemoryBackend, HttpMemoryBackend, MemoryBackend, SearchHit,
    SearchRequest, SearchResponse, WriteRequest, WriteResponse,
};
/// Container tags and isolation checks.
pub use container::{
    ContainerKind, ContainerTag, WORLD_SUFFIX, validate_character_container, validate_container,
    validate_world_container,
};
/// Memory error types.
pub use error::{BackendError, MemoryError, ValidationError};
/// Metadata filter predicates.
pub use filter::{FilterPredicate, FilterRequest, build_filter};
/// Stored content layouts.
pub use format::{
    EnrichedMessage, GameTime, ParsedMessage, format_enriched_character_message,
    format_message_line, format_world_message, format_world_state_update,
    parse_enriched_character_message, parse_message_line,
};
/// Record metadata.
pub use metadata::{ContentType, Metadata, MetadataFields, build_metadata, is_speaker_container};
