//! Room and message domain types.

use std::{cmp::Ordering, fmt};

use chrono::{DateTime, Utc};
use klatsch_proto::events::WireMessage;

use crate::error::EngineError;

/// Opaque room identifier: exactly six ASCII alphanumeric characters,
/// canonicalized to uppercase.
///
/// # Invariants
///
/// A constructed `RoomCode` is always canonical. Validation happens at the
/// boundary ([`RoomCode::parse`]); the engine assumes any code it receives
/// already satisfies the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// Required code length.
    pub const LEN: usize = 6;

    /// Parse and canonicalize user input into a room code.
    ///
    /// Surrounding whitespace is tolerated; the result is uppercased.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidInput` if the trimmed input is not exactly
    ///   six ASCII alphanumeric characters
    pub fn parse(input: &str) -> Result<Self, EngineError> {
        let trimmed = input.trim();

        if trimmed.len() != Self::LEN {
            return Err(EngineError::InvalidInput {
                reason: format!("room code must be {} characters, got {}", Self::LEN, trimmed.len()),
            });
        }

        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(EngineError::InvalidInput {
                reason: "room code must be ASCII alphanumeric".to_string(),
            });
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The signed-in user, resolved once per application session from the
/// Identity Provider. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Stable user id.
    pub id: String,
    /// Display name.
    pub display_name: String,
}

/// An immutable chat message.
///
/// Born when the backend accepts a send; the client never fabricates an id
/// or timestamp. Retained client-side only for the lifetime of the room
/// view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned id, unique within the room.
    pub id: String,
    /// Stable id of the author.
    pub author_id: String,
    /// Display name of the author at send time.
    pub author_label: String,
    /// Message text.
    pub content: String,
    /// Server-assigned creation instant.
    pub timestamp: DateTime<Utc>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Self {
            id: wire.id,
            author_id: wire.author_id,
            author_label: wire.author_label,
            content: wire.content,
            timestamp: wire.timestamp,
        }
    }
}

impl From<Message> for WireMessage {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            author_id: msg.author_id,
            author_label: msg.author_label,
            content: msg.content,
            timestamp: msg.timestamp,
        }
    }
}

/// The single ordering rule for conversation views: timestamp first, id as
/// a deterministic tie-break for simultaneous messages.
#[must_use]
pub fn chronological(a: &Message, b: &Message) -> Ordering {
    a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn msg(id: &str, secs: i64) -> Message {
        Message {
            id: id.to_string(),
            author_id: "u1".to_string(),
            author_label: "ada".to_string(),
            content: "hi".to_string(),
            timestamp: Utc.timestamp_opt(secs, 0).single().unwrap(),
        }
    }

    #[test]
    fn parse_canonicalizes_to_uppercase() {
        let code = RoomCode::parse("ab12cd").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace() {
        let code = RoomCode::parse("  xy99zw ").unwrap();
        assert_eq!(code.as_str(), "XY99ZW");
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(matches!(RoomCode::parse("ab12c"), Err(EngineError::InvalidInput { .. })));
        assert!(matches!(RoomCode::parse("ab12cde"), Err(EngineError::InvalidInput { .. })));
        assert!(matches!(RoomCode::parse(""), Err(EngineError::InvalidInput { .. })));
    }

    #[test]
    fn parse_rejects_non_alphanumeric() {
        assert!(matches!(RoomCode::parse("ab-2cd"), Err(EngineError::InvalidInput { .. })));
        assert!(matches!(RoomCode::parse("ab12cé"), Err(EngineError::InvalidInput { .. })));
    }

    #[test]
    fn chronological_orders_by_timestamp_first() {
        assert_eq!(chronological(&msg("b", 10), &msg("a", 20)), Ordering::Less);
        assert_eq!(chronological(&msg("a", 20), &msg("b", 10)), Ordering::Greater);
    }

    #[test]
    fn chronological_breaks_ties_by_id() {
        assert_eq!(chronological(&msg("a", 10), &msg("b", 10)), Ordering::Less);
        assert_eq!(chronological(&msg("a", 10), &msg("a", 10)), Ordering::Equal);
    }
}
