//! Structured metadata attached to every stored record.

use crate::container::ContainerTag;
use crate::error::ValidationError;
use crate::format::GameTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator for stored content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Message,
    Lorebook,
    CharacterCard,
    Scenario,
    WorldStateUpdate,
}

impl ContentType {
    /// Wire name of the content type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Message => "message",
            ContentType::Lorebook => "lorebook",
            ContentType::CharacterCard => "character_card",
            ContentType::Scenario => "scenario",
            ContentType::WorldStateUpdate => "world_state_update",
        }
    }

    /// Content written once at session start and never superseded.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ContentType::Scenario | ContentType::CharacterCard | ContentType::Lorebook
        )
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata as sent to and stored by the backend.
///
/// Never used for ranking, only for exact filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_time_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_speaker: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lorebook_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent: Option<bool>,
}

/// Caller-supplied fields, checked by [`build_metadata`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFields {
    pub speaker: Option<String>,
    pub participants: Option<Vec<String>>,
    pub game_time: Option<GameTime>,
    pub is_speaker: Option<bool>,
    pub lorebook_key: Option<String>,
}

/// Assemble metadata for `content_type`, enforcing its required fields.
///
/// - `message`: `speaker`, `participants`, `game_time`.
/// - `world_state_update`: `game_time`.
/// - `lorebook`: `lorebook_key`.
///
/// Permanent types always carry `permanent: true`. Empty strings count as
/// missing.
pub fn build_metadata(
    content_type: ContentType,
    fields: MetadataFields,
) -> Result<Metadata, ValidationError> {
    let missing = |field: &'static str| ValidationError::MissingRequiredField {
        content_type: content_type.as_str(),
        field,
    };
    let speaker = fields.speaker.filter(|speaker| !speaker.trim().is_empty());
    let lorebook_key = fields.lorebook_key.filter(|key| !key.trim().is_empty());

    match content_type {
        ContentType::Message => {
            if speaker.is_none() {
                return Err(missing("speaker"));
            }
            if fields.participants.is_none() {
                return Err(missing("participants"));
            }
            if fields.game_time.is_none() {
                return Err(missing("gameTime"));
            }
        }
        ContentType::WorldStateUpdate => {
            if fields.game_time.is_none() {
                return Err(missing("gameTime"));
            }
        }
        ContentType::Lorebook => {
            if lorebook_key.is_none() {
                return Err(missing("lorebookKey"));
            }
        }
        ContentType::Scenario | ContentType::CharacterCard => {}
    }

    let (game_time, game_time_interval) = match fields.game_time {
        Some(game_time) => (Some(game_time.value), Some(game_time.interval)),
        None => (None, None),
    };
    Ok(Metadata {
        content_type,
        speaker,
        participants: fields.participants,
        game_time,
        game_time_interval,
        is_speaker: fields.is_speaker,
        lorebook_key,
        permanent: content_type.is_permanent().then_some(true),
    })
}

/// `true` exactly when `container` is the speaker's own container.
pub fn is_speaker_container(container: &ContainerTag, speaker_container: &ContainerTag) -> bool {
    container == speaker_container
}
