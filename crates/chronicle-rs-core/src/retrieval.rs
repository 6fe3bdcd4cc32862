//! Memory retrieval service.
//!
//! Queries are scoped to exactly one container. Backend failures come back
//! as an empty [`MemoryQueryResult`], never as an error.

use crate::boundary::ErrorBoundary;
use crate::observer::{MemoryEvent, MemoryObserver, MemoryOperation, emit};
use chronicle_rs_memory::format::{CURRENT_TIME_HEADER, format_game_time};
use chronicle_rs_memory::{
    FilterPredicate, FilterRequest, GameTime, MemoryBackend, SearchHit, SearchRequest,
    ValidationError, build_filter, format_message_line, validate_character_container,
    validate_world_container,
};
use log::{debug, info};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Default number of memories recalled for a character.
pub const DEFAULT_CHARACTER_LIMIT: usize = 5;
/// Default number of memories recalled for the world.
pub const DEFAULT_WORLD_LIMIT: usize = 10;

const RECENT_MESSAGES_HEADER: &str = "###Recent messages###";
const INSTRUCTION_HEADER: &str = "###Instruction###";

/// A message from the conversation so far, used as query context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentMessage {
    pub speaker_name: String,
    pub content: String,
    pub game_time: GameTime,
}

/// Recall for a character about to speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterMemoryQuery {
    pub container_tag: String,
    pub game_time: GameTime,
    pub recent_messages: Vec<RecentMessage>,
    pub speaker_name: String,
    /// Falls back to the service's character limit.
    pub limit: Option<usize>,
}

/// Recall for the world agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldMemoryQuery {
    pub container_tag: String,
    pub game_time: GameTime,
    /// Falls back to the service's world limit.
    pub limit: Option<usize>,
    pub include_metadata: bool,
    pub filter: FilterRequest,
}

/// Normalized query answer. `count()` always equals `memories().len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryQueryResult {
    memories: Vec<String>,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Vec<Value>>,
}

impl MemoryQueryResult {
    fn empty(include_metadata: bool) -> Self {
        Self {
            memories: Vec::new(),
            count: 0,
            metadata: include_metadata.then(Vec::new),
        }
    }

    fn from_hits(hits: Vec<SearchHit>, limit: usize, include_metadata: bool) -> Self {
        let mut memories = Vec::with_capacity(hits.len().min(limit));
        let mut metadata = include_metadata.then(Vec::new);
        for hit in hits.into_iter().take(limit) {
            memories.push(hit.memory);
            if let Some(metadata) = metadata.as_mut() {
                metadata.push(hit.metadata.unwrap_or_else(|| Value::Object(Map::new())));
            }
        }
        Self {
            count: memories.len(),
            memories,
            metadata,
        }
    }

    pub fn memories(&self) -> &[String] {
        &self.memories
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Per-memory metadata, present only when it was requested.
    pub fn metadata(&self) -> Option<&[Value]> {
        self.metadata.as_deref()
    }

    pub fn into_memories(self) -> Vec<String> {
        self.memories
    }
}

/// Issues container-scoped recall queries.
#[derive(Clone)]
pub struct RetrievalService {
    backend: Arc<dyn MemoryBackend>,
    boundary: ErrorBoundary,
    character_limit: usize,
    world_limit: usize,
}

impl RetrievalService {
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self::with_observer(backend, None)
    }

    /// Create a service that reports every call to `observer`.
    pub fn with_observer(
        backend: Arc<dyn MemoryBackend>,
        observer: Option<Arc<dyn MemoryObserver>>,
    ) -> Self {
        info!(
            "memory retrieval service ready (observer={})",
            observer.is_some()
        );
        Self {
            backend,
            boundary: ErrorBoundary::new(observer),
            character_limit: DEFAULT_CHARACTER_LIMIT,
            world_limit: DEFAULT_WORLD_LIMIT,
        }
    }

    /// Override the limits used when a query leaves `limit` unset.
    pub fn with_limits(mut self, character_limit: usize, world_limit: usize) -> Self {
        self.character_limit = character_limit;
        self.world_limit = world_limit;
        self
    }

    /// Recall memories relevant to a character's next reply.
    pub async fn query_character_memories(
        &self,
        query: CharacterMemoryQuery,
    ) -> Result<MemoryQueryResult, ValidationError> {
        let operation = MemoryOperation::QueryCharacterMemories;
        validate_character_container(&query.container_tag)
            .map_err(|err| self.boundary.reject(operation, &query.container_tag, err))?;
        let text = character_query_text(&query);
        let limit = query.limit.unwrap_or(self.character_limit);
        Ok(self
            .search(operation, query.container_tag, text, limit, None, false)
            .await)
    }

    /// Recall world memories around the current game time.
    pub async fn query_world_memories(
        &self,
        query: WorldMemoryQuery,
    ) -> Result<MemoryQueryResult, ValidationError> {
        let operation = MemoryOperation::QueryWorldMemories;
        validate_world_container(&query.container_tag)
            .map_err(|err| self.boundary.reject(operation, &query.container_tag, err))?;
        let text = world_query_text(&query.game_time);
        let limit = query.limit.unwrap_or(self.world_limit);
        let filter = build_filter(&query.filter);
        let filter = (!filter.is_empty()).then_some(filter);
        Ok(self
            .search(
                operation,
                query.container_tag,
                text,
                limit,
                filter,
                query.include_metadata,
            )
            .await)
    }

    async fn search(
        &self,
        operation: MemoryOperation,
        container_tag: String,
        text: String,
        limit: usize,
        filter: Option<FilterPredicate>,
        include_metadata: bool,
    ) -> MemoryQueryResult {
        debug!(
            "memory query (operation={}, container={}, limit={}, filtered={}, query_len={})",
            operation.as_str(),
            container_tag,
            limit,
            filter.is_some(),
            text.len()
        );
        if limit == 0 {
            return MemoryQueryResult::empty(include_metadata);
        }
        let request = SearchRequest {
            q: text.clone(),
            container_tag: container_tag.clone(),
            limit,
            filter,
        };
        let Some(response) = self
            .boundary
            .run(operation, &container_tag, self.backend.search(request))
            .await
        else {
            return MemoryQueryResult::empty(include_metadata);
        };
        let result = MemoryQueryResult::from_hits(response.results, limit, include_metadata);
        debug!(
            "memory query answered (operation={}, container={}, count={})",
            operation.as_str(),
            container_tag,
            result.count()
        );
        emit(
            self.boundary.observer(),
            MemoryEvent::QueryCompleted {
                operation,
                container_tag,
                query: text,
                memories: result.memories.clone(),
            },
        );
        result
    }
}

/// Query text for a character: current time, recent messages, instruction.
fn character_query_text(query: &CharacterMemoryQuery) -> String {
    let recent = query
        .recent_messages
        .iter()
        .map(|message| {
            format_message_line(&message.speaker_name, &message.content, &message.game_time)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{CURRENT_TIME_HEADER}\n{}\n\n{RECENT_MESSAGES_HEADER}\n{recent}\n\n{INSTRUCTION_HEADER}\n\
         Return memories that help {} respond to the recent messages. \
         Do not duplicate the recent messages themselves.",
        format_game_time(&query.game_time),
        query.speaker_name
    )
}

/// Query text for the world: current time plus instruction.
fn world_query_text(game_time: &GameTime) -> String {
    format!(
        "{CURRENT_TIME_HEADER}\n{}\n\n{INSTRUCTION_HEADER}\n\
         Return world events and state changes relevant at the current time.",
        format_game_time(game_time)
    )
}
