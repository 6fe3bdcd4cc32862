//! Content formatting for stored memory records.
//!
//! The text produced here is what the backend ranks, and it outlives the
//! process that wrote it. The layouts are therefore fixed: readers of older
//! records rely on [`parse_enriched_character_message`] understanding them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Section header for the current game time.
pub const CURRENT_TIME_HEADER: &str = "###Current time###";
/// Section header for the message line.
pub const MESSAGE_HEADER: &str = "###Message###";
/// Section header for newly discovered world knowledge.
pub const WORLD_KNOWLEDGE_HEADER: &str = "###Newly discovered world knowledge###";

/// In-fiction timestamp: a numeric value plus its interval unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameTime {
    pub value: i64,
    pub interval: String,
}

impl GameTime {
    pub fn new(value: i64, interval: impl Into<String>) -> Self {
        Self {
            value,
            interval: interval.into(),
        }
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.interval)
    }
}

/// `GameTime: {value} {interval}`
pub fn format_game_time(game_time: &GameTime) -> String {
    format!("GameTime: {game_time}")
}

/// Single-line rendering of a message, shared by world records and queries.
pub fn format_message_line(speaker_name: &str, content: &str, game_time: &GameTime) -> String {
    format!(
        "Message: {speaker_name}: {content} {}",
        format_game_time(game_time)
    )
}

/// Raw world-container message.
pub fn format_world_message(speaker_name: &str, content: &str, game_time: &GameTime) -> String {
    format_message_line(speaker_name, content, game_time)
}

/// Sectioned character-container message.
///
/// The world knowledge section is left out entirely when `world_knowledge`
/// is absent or blank.
pub fn format_enriched_character_message(
    game_time: &GameTime,
    speaker_name: &str,
    content: &str,
    world_knowledge: Option<&str>,
) -> String {
    let mut sections = vec![
        format!("{CURRENT_TIME_HEADER}\n{}", format_game_time(game_time)),
        format!(
            "{MESSAGE_HEADER}\n{}",
            format_message_line(speaker_name, content, game_time)
        ),
    ];
    if let Some(knowledge) = world_knowledge.filter(|knowledge| !knowledge.trim().is_empty()) {
        sections.push(format!("{WORLD_KNOWLEDGE_HEADER}\n{knowledge}"));
    }
    sections.join("\n\n")
}

/// World-state change description.
pub fn format_world_state_update(description: &str, game_time: &GameTime) -> String {
    format!("{description}. {}", format_game_time(game_time))
}

/// Components of a parsed `Message: ...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub speaker_name: String,
    pub content: String,
    pub game_time: GameTime,
}

/// Components of a parsed enriched character record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedMessage {
    pub game_time: GameTime,
    pub message: ParsedMessage,
    pub world_knowledge: Option<String>,
}

/// Parse a line produced by [`format_message_line`].
///
/// The speaker name ends at the first `": "`, so a name that itself contains
/// `": "` is split there and the rest is read as content.
pub fn parse_message_line(line: &str) -> Option<ParsedMessage> {
    let Ok(regex) = Regex::new(r"(?s)^Message: (.*?): (.*) GameTime: (-?\d+) (.+)$") else {
        return None;
    };
    let caps = regex.captures(line.trim())?;
    Some(ParsedMessage {
        speaker_name: caps[1].to_string(),
        content: caps[2].to_string(),
        game_time: GameTime::new(caps[3].parse().ok()?, caps[4].trim()),
    })
}

/// Parse a record produced by [`format_enriched_character_message`].
///
/// Only the three known headers delimit sections, in their fixed order, so
/// header-like lines inside the message or the knowledge text are kept as
/// text. The message ends at its own `GameTime` suffix; everything after the
/// knowledge header is the knowledge body.
///
/// Returns `None` if the time or message section is missing or malformed.
pub fn parse_enriched_character_message(content: &str) -> Option<EnrichedMessage> {
    let rest = content.strip_prefix(CURRENT_TIME_HEADER)?.strip_prefix('\n')?;
    let (time_line, rest) = rest.split_once("\n\n")?;
    let game_time = parse_game_time(time_line)?;
    let rest = rest.strip_prefix(MESSAGE_HEADER)?.strip_prefix('\n')?;

    let suffix = format!(" {}", format_game_time(&game_time));
    let knowledge_marker = format!("{suffix}\n\n{WORLD_KNOWLEDGE_HEADER}\n");
    let (message_line, world_knowledge) = match rest.find(&knowledge_marker) {
        Some(at) => (
            &rest[..at + suffix.len()],
            Some(&rest[at + knowledge_marker.len()..]),
        ),
        None => (rest, None),
    };

    let message = parse_message_line(message_line)?;
    let world_knowledge = world_knowledge
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string);
    Some(EnrichedMessage {
        game_time,
        message,
        world_knowledge,
    })
}

fn parse_game_time(line: &str) -> Option<GameTime> {
    let (value, interval) = line.trim().strip_prefix("GameTime: ")?.split_once(' ')?;
    Some(GameTime::new(value.parse().ok()?, interval.trim()))
}
