//! Memory storage service.
//!
//! Every operation validates its container tag and metadata first and
//! reports problems as [`ValidationError`]. Once input is accepted the write
//! is best-effort: a backend failure yields [`StoreOutcome::failed`] and the
//! caller carries on.

use crate::boundary::ErrorBoundary;
use crate::observer::{MemoryEvent, MemoryObserver, MemoryOperation, emit};
use chronicle_rs_memory::{
    ContainerKind, ContainerTag, ContentType, GameTime, MemoryBackend, Metadata, MetadataFields,
    ValidationError, WORLD_SUFFIX, WriteRequest, build_metadata,
    format_enriched_character_message, format_world_message, format_world_state_update,
    is_speaker_container, validate_character_container, validate_container,
    validate_world_container,
};
use futures_util::future::{join, join_all};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Result of a write. `id` is `None` exactly when `success` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOutcome {
    pub success: bool,
    pub id: Option<String>,
}

impl StoreOutcome {
    pub fn stored(id: String) -> Self {
        Self {
            success: true,
            id: Some(id),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            id: None,
        }
    }
}

/// A message as written to the shared world container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldMessage {
    pub container_tag: String,
    pub speaker_name: String,
    pub content: String,
    pub participants: Vec<String>,
    pub game_time: GameTime,
}

/// A message as written to one character's container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterMessage {
    pub container_tag: String,
    pub game_time: GameTime,
    pub speaker_name: String,
    pub content: String,
    /// Knowledge this character picked up during the turn, if any.
    pub world_knowledge: Option<String>,
    /// Whether this container belongs to the speaker.
    pub is_speaker: bool,
    pub participants: Vec<String>,
}

/// Permanent content written once when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializationContent {
    pub container_tag: String,
    /// Namespace the tag must belong to.
    pub container_kind: ContainerKind,
    /// One of `scenario`, `character_card` or `lorebook`.
    pub content_type: ContentType,
    pub content: String,
    /// Required for `lorebook` content.
    pub lorebook_key: Option<String>,
}

/// A change to the state of the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldStateUpdate {
    pub container_tag: String,
    pub description: String,
    pub game_time: GameTime,
}

/// One participant of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnParticipant {
    pub character_id: String,
    pub name: String,
    pub world_knowledge: Option<String>,
}

/// A single logical turn, fanned out to every participant plus the world.
///
/// The speaker does not have to be listed in `participants`; their container
/// is written either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnEvent {
    pub session_id: String,
    pub speaker_id: String,
    pub speaker_name: String,
    pub content: String,
    pub game_time: GameTime,
    pub participants: Vec<TurnParticipant>,
}

/// Outcome of one participant's write within a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantOutcome {
    pub character_id: String,
    pub outcome: Result<StoreOutcome, ValidationError>,
}

/// Independent outcomes of every write issued for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnStoreReport {
    pub world: Result<StoreOutcome, ValidationError>,
    pub characters: Vec<ParticipantOutcome>,
}

impl TurnStoreReport {
    /// Whether every write in the turn succeeded.
    pub fn all_stored(&self) -> bool {
        let stored =
            |outcome: &Result<StoreOutcome, ValidationError>| matches!(outcome, Ok(o) if o.success);
        stored(&self.world)
            && self
                .characters
                .iter()
                .all(|participant| stored(&participant.outcome))
    }
}

/// Writes formatted records into character and world containers.
#[derive(Clone)]
pub struct StorageService {
    backend: Arc<dyn MemoryBackend>,
    boundary: ErrorBoundary,
}

impl StorageService {
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self::with_observer(backend, None)
    }

    /// Create a service that reports every call to `observer`.
    pub fn with_observer(
        backend: Arc<dyn MemoryBackend>,
        observer: Option<Arc<dyn MemoryObserver>>,
    ) -> Self {
        info!(
            "memory storage service ready (observer={})",
            observer.is_some()
        );
        Self {
            backend,
            boundary: ErrorBoundary::new(observer),
        }
    }

    /// Store a raw message in the world container.
    pub async fn store_world_message(
        &self,
        message: WorldMessage,
    ) -> Result<StoreOutcome, ValidationError> {
        let operation = MemoryOperation::StoreWorldMessage;
        let tag = message.container_tag;
        validate_world_container(&tag)
            .map_err(|err| self.boundary.reject(operation, &tag, err))?;
        let content =
            format_world_message(&message.speaker_name, &message.content, &message.game_time);
        let metadata = build_metadata(
            ContentType::Message,
            MetadataFields {
                speaker: Some(message.speaker_name),
                participants: Some(message.participants),
                game_time: Some(message.game_time),
                ..MetadataFields::default()
            },
        )
        .map_err(|err| self.boundary.reject(operation, &tag, err))?;
        Ok(self.write(operation, tag, content, metadata).await)
    }

    /// Store the sectioned form of a message in a character's container.
    pub async fn store_character_message(
        &self,
        message: CharacterMessage,
    ) -> Result<StoreOutcome, ValidationError> {
        let operation = MemoryOperation::StoreCharacterMessage;
        let tag = message.container_tag;
        validate_character_container(&tag)
            .map_err(|err| self.boundary.reject(operation, &tag, err))?;
        let content = format_enriched_character_message(
            &message.game_time,
            &message.speaker_name,
            &message.content,
            message.world_knowledge.as_deref(),
        );
        let metadata = build_metadata(
            ContentType::Message,
            MetadataFields {
                speaker: Some(message.speaker_name),
                participants: Some(message.participants),
                game_time: Some(message.game_time),
                is_speaker: Some(message.is_speaker),
                ..MetadataFields::default()
            },
        )
        .map_err(|err| self.boundary.reject(operation, &tag, err))?;
        Ok(self.write(operation, tag, content, metadata).await)
    }

    /// Store scenario, character card or lorebook content.
    pub async fn store_initialization_content(
        &self,
        init: InitializationContent,
    ) -> Result<StoreOutcome, ValidationError> {
        let operation = MemoryOperation::StoreInitializationContent;
        let tag = init.container_tag;
        validate_container(&tag, init.container_kind)
            .map_err(|err| self.boundary.reject(operation, &tag, err))?;
        if !init.content_type.is_permanent() {
            let err = ValidationError::InvalidContentType {
                content_type: init.content_type.as_str(),
                operation: operation.as_str(),
            };
            return Err(self.boundary.reject(operation, &tag, err));
        }
        let metadata = build_metadata(
            init.content_type,
            MetadataFields {
                lorebook_key: init.lorebook_key,
                ..MetadataFields::default()
            },
        )
        .map_err(|err| self.boundary.reject(operation, &tag, err))?;
        Ok(self.write(operation, tag, init.content, metadata).await)
    }

    /// Store a description of how the world changed.
    pub async fn store_world_state_update(
        &self,
        update: WorldStateUpdate,
    ) -> Result<StoreOutcome, ValidationError> {
        let operation = MemoryOperation::StoreWorldStateUpdate;
        let tag = update.container_tag;
        validate_world_container(&tag)
            .map_err(|err| self.boundary.reject(operation, &tag, err))?;
        let content = format_world_state_update(&update.description, &update.game_time);
        let metadata = build_metadata(
            ContentType::WorldStateUpdate,
            MetadataFields {
                game_time: Some(update.game_time),
                ..MetadataFields::default()
            },
        )
        .map_err(|err| self.boundary.reject(operation, &tag, err))?;
        Ok(self.write(operation, tag, content, metadata).await)
    }

    /// Write one turn into every participant's container and the world
    /// container concurrently. Each write succeeds or fails on its own.
    ///
    /// The speaker's container is always written, even when the speaker is
    /// not listed in `participants`. Repeated character ids are written once,
    /// using the first entry.
    pub async fn store_turn(&self, turn: TurnEvent) -> TurnStoreReport {
        let roster = turn_roster(&turn);
        let participant_names: Vec<String> = roster
            .iter()
            .map(|participant| participant.name.clone())
            .collect();
        let turn = &turn;
        let speaker_tag = ContainerTag::character(&turn.session_id, &turn.speaker_id).ok();
        let speaker_tag = speaker_tag.as_ref();
        debug!(
            "storing turn (session={}, speaker={}, participants={})",
            turn.session_id,
            turn.speaker_id,
            roster.len()
        );

        let world_names = participant_names.clone();
        let world = async move {
            match ContainerTag::world(&turn.session_id) {
                Ok(tag) => {
                    self.store_world_message(WorldMessage {
                        container_tag: tag.into_string(),
                        speaker_name: turn.speaker_name.clone(),
                        content: turn.content.clone(),
                        participants: world_names,
                        game_time: turn.game_time.clone(),
                    })
                    .await
                }
                Err(err) => {
                    let tag = format!("{}{WORLD_SUFFIX}", turn.session_id);
                    Err(self
                        .boundary
                        .reject(MemoryOperation::StoreWorldMessage, &tag, err))
                }
            }
        };

        let characters = roster.iter().map(|participant| {
            let message = ContainerTag::character(&turn.session_id, &participant.character_id)
                .map(|tag| CharacterMessage {
                    is_speaker: speaker_tag
                        .is_some_and(|speaker| is_speaker_container(&tag, speaker)),
                    container_tag: tag.into_string(),
                    game_time: turn.game_time.clone(),
                    speaker_name: turn.speaker_name.clone(),
                    content: turn.content.clone(),
                    world_knowledge: participant.world_knowledge.clone(),
                    participants: participant_names.clone(),
                });
            let session_id = turn.session_id.as_str();
            async move {
                let outcome = match message {
                    Ok(message) => self.store_character_message(message).await,
                    Err(err) => {
                        let tag = format!("{session_id}-{}", participant.character_id);
                        Err(self.boundary.reject(
                            MemoryOperation::StoreCharacterMessage,
                            &tag,
                            err,
                        ))
                    }
                };
                ParticipantOutcome {
                    character_id: participant.character_id.clone(),
                    outcome,
                }
            }
        });

        let (world, characters) = join(world, join_all(characters)).await;
        TurnStoreReport { world, characters }
    }

    async fn write(
        &self,
        operation: MemoryOperation,
        container_tag: String,
        content: String,
        metadata: Metadata,
    ) -> StoreOutcome {
        debug!(
            "memory store (operation={}, container={}, type={}, content_len={})",
            operation.as_str(),
            container_tag,
            metadata.content_type,
            content.len()
        );
        let request = WriteRequest {
            content: content.clone(),
            container_tag: container_tag.clone(),
            metadata: metadata.clone(),
        };
        match self
            .boundary
            .run(operation, &container_tag, self.backend.write(request))
            .await
        {
            Some(response) => {
                emit(
                    self.boundary.observer(),
                    MemoryEvent::StoreCompleted {
                        operation,
                        container_tag,
                        id: response.id.clone(),
                        content,
                        metadata,
                    },
                );
                StoreOutcome::stored(response.id)
            }
            None => StoreOutcome::failed(),
        }
    }
}

/// Participants of `turn` with repeated ids dropped and the speaker added
/// if missing.
fn turn_roster(turn: &TurnEvent) -> Vec<TurnParticipant> {
    let mut seen = HashSet::new();
    let mut roster: Vec<TurnParticipant> = turn
        .participants
        .iter()
        .filter(|participant| seen.insert(participant.character_id.as_str()))
        .cloned()
        .collect();
    if !seen.contains(turn.speaker_id.as_str()) {
        roster.push(TurnParticipant {
            character_id: turn.speaker_id.clone(),
            name: turn.speaker_name.clone(),
            world_knowledge: None,
        });
    }
    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn report_requires_every_write() {
        let mut report = TurnStoreReport {
            world: Ok(StoreOutcome::stored("w".to_string())),
            characters: vec![ParticipantOutcome {
                character_id: "c1".to_string(),
                outcome: Ok(StoreOutcome::stored("c".to_string())),
            }],
        };
        assert!(report.all_stored());

        report.characters[0].outcome = Ok(StoreOutcome::failed());
        assert!(!report.all_stored());
    }

    fn participant(id: &str, name: &str) -> TurnParticipant {
        TurnParticipant {
            character_id: id.to_string(),
            name: name.to_string(),
            world_knowledge: None,
        }
    }

    #[test]
    fn roster_adds_missing_speaker_and_drops_repeats() {
        let turn = TurnEvent {
            session_id: "s".to_string(),
            speaker_id: "alice".to_string(),
            speaker_name: "Alice".to_string(),
            content: "hi".to_string(),
            game_time: GameTime::new(1, "Day"),
            participants: vec![
                participant("bob", "Bob"),
                participant("bob", "Robert"),
                participant("carol", "Carol"),
            ],
        };
        assert_eq!(
            turn_roster(&turn),
            vec![
                participant("bob", "Bob"),
                participant("carol", "Carol"),
                participant("alice", "Alice"),
            ]
        );
    }

    #[test]
    fn failed_outcome_has_no_id() {
        assert_eq!(
            StoreOutcome::failed(),
            StoreOutcome {
                success: false,
                id: None
            }
        );
    }
}
