//! Container tags and the isolation checks applied to them.
//!
//! Every stored record lives in exactly one container. Character containers
//! are `"{session_id}-{character_id}"`, the shared world container of a
//! session is `"{session_id}-world"`. The suffix is the only thing that
//! separates the two namespaces, so it is checked at the start of every
//! storage and retrieval operation.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal suffix that marks a world container.
pub const WORLD_SUFFIX: &str = "-world";

/// Namespace a container belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Memories of one character within one session.
    Character,
    /// Shared memories of the session's world.
    World,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Character => f.write_str("character"),
            ContainerKind::World => f.write_str("world"),
        }
    }
}

/// Validated container identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerTag(String);

impl ContainerTag {
    /// Derive the container of a character within a session.
    pub fn character(session_id: &str, character_id: &str) -> Result<Self, ValidationError> {
        if session_id.is_empty() {
            return Err(invalid(
                &format!("-{character_id}"),
                "session id must not be empty",
            ));
        }
        if character_id.is_empty() {
            return Err(invalid(
                &format!("{session_id}-"),
                "character id must not be empty",
            ));
        }
        let tag = format!("{session_id}-{character_id}");
        validate_character_container(&tag)?;
        Ok(Self(tag))
    }

    /// Derive the world container of a session.
    pub fn world(session_id: &str) -> Result<Self, ValidationError> {
        let tag = format!("{session_id}{WORLD_SUFFIX}");
        validate_world_container(&tag)?;
        Ok(Self(tag))
    }

    /// Validate an existing tag against the expected namespace.
    pub fn parse(tag: &str, kind: ContainerKind) -> Result<Self, ValidationError> {
        validate_container(tag, kind)?;
        Ok(Self(tag.to_string()))
    }

    /// Namespace implied by the tag's suffix.
    pub fn kind(&self) -> ContainerKind {
        kind_of(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ContainerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContainerTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reject tags that name the world container or are empty.
pub fn validate_character_container(tag: &str) -> Result<(), ValidationError> {
    if tag.is_empty() {
        return Err(invalid(tag, "container tag must not be empty"));
    }
    if tag.ends_with(WORLD_SUFFIX) {
        return Err(invalid(
            tag,
            "character container must not end with `-world`",
        ));
    }
    Ok(())
}

/// Reject tags that do not name a world container or have no session id.
pub fn validate_world_container(tag: &str) -> Result<(), ValidationError> {
    if !tag.ends_with(WORLD_SUFFIX) {
        return Err(invalid(tag, "world container must end with `-world`"));
    }
    if tag == WORLD_SUFFIX {
        return Err(invalid(tag, "session id must not be empty"));
    }
    Ok(())
}

/// Dispatch to the validator for `kind`.
pub fn validate_container(tag: &str, kind: ContainerKind) -> Result<(), ValidationError> {
    match kind {
        ContainerKind::Character => validate_character_container(tag),
        ContainerKind::World => validate_world_container(tag),
    }
}

fn kind_of(tag: &str) -> ContainerKind {
    if tag.ends_with(WORLD_SUFFIX) {
        ContainerKind::World
    } else {
        ContainerKind::Character
    }
}

fn invalid(tag: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidContainerTag {
        tag: tag.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn character_validator_rejects_world_suffix() {
        let err = validate_character_container("sess1-world").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidContainerTag { .. }));
        assert!(validate_character_container("sess1-char42").is_ok());
    }

    #[test]
    fn world_validator_requires_world_suffix() {
        assert!(validate_world_container("sess1-world").is_ok());
        let err = validate_world_container("sess1-char42").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidContainerTag { .. }));
        assert!(validate_world_container("").is_err());
    }

    #[test]
    fn empty_character_tag_is_rejected() {
        assert!(validate_character_container("").is_err());
        assert!(ContainerTag::character("sess1", "").is_err());
    }

    #[test]
    fn derived_tags_match_wire_format() {
        let character = ContainerTag::character("sess1", "char42").expect("character");
        assert_eq!(character.as_str(), "sess1-char42");
        assert_eq!(character.kind(), ContainerKind::Character);

        let world = ContainerTag::world("sess1").expect("world");
        assert_eq!(world.as_str(), "sess1-world");
        assert_eq!(world.kind(), ContainerKind::World);
    }

    #[test]
    fn empty_session_id_is_rejected() {
        let err = ContainerTag::world("").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidContainerTag {
                tag: "-world".to_string(),
                reason: "session id must not be empty".to_string(),
            }
        );
        assert!(validate_world_container("-world").is_err());
        assert!(ContainerTag::parse("-world", ContainerKind::World).is_err());
        assert!(ContainerTag::character("", "bob").is_err());
    }

    #[test]
    fn character_named_world_cannot_shadow_world_container() {
        let err = ContainerTag::character("sess1", "world").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidContainerTag { .. }));
    }

    #[test]
    fn parse_checks_requested_kind() {
        assert!(ContainerTag::parse("sess1-world", ContainerKind::World).is_ok());
        assert!(ContainerTag::parse("sess1-world", ContainerKind::Character).is_err());
        assert!(ContainerTag::parse("sess1-bob", ContainerKind::World).is_err());
    }

    #[test]
    fn tag_serializes_as_plain_string() {
        let tag = ContainerTag::world("s").expect("world");
        assert_eq!(serde_json::to_string(&tag).expect("json"), "\"s-world\"");
    }
}
