//! Payload structs for the named channel events.
//!
//! Timestamps are UTC instants assigned by the backend; the client never
//! fabricates an id or a timestamp. The `author_id`/`author_label` pair is
//! the normalized form of the sender identity (no union-typed user field).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted chat message as it appears on the wire.
///
/// Created exclusively by the backend when a send is accepted. `id` is
/// unique within a room; ordering is authoritative by `(timestamp, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Server-assigned message id, unique within the room.
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

/// Join-room request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoom {
    /// Canonical (uppercase, six-character) room code.
    pub room: String,
    /// Bearer credential from the identity provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

/// Server acknowledgment of a join; transitions the session to joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAck {
    /// Room code being acknowledged.
    pub room: String,
    /// Current room topic, if one is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// Message-create request.
///
/// `request_id` correlates the single [`MessageAck`] the server sends back.
/// The persisted message itself arrives only via [`MessageCreated`]; the
/// ack carries no message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreate {
    /// Client-chosen correlation id for the acknowledgment.
    pub request_id: u64,
    /// Canonical room code.
    pub room: String,
    /// Message text (non-empty after trim; enforced client-side).
    pub content: String,
    /// Stable id of the sender.
    pub author_id: String,
}

/// Server acknowledgment of a [`MessageCreate`] request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAck {
    /// Correlation id from the originating request.
    pub request_id: u64,
    /// `None` on success; a human-readable reason on rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Broadcast of a persisted message to every joined participant,
/// including the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreated {
    /// Room the message belongs to.
    pub room: String,
    /// The persisted message.
    pub message: WireMessage,
}

/// Error event for failures not tied to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Error code identifying the failure class.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorEvent {
    /// Room code does not resolve.
    pub const ROOM_NOT_FOUND: u16 = 0x0001;
    /// Caller is not a member of the room.
    pub const UNAUTHORIZED: u16 = 0x0002;
    /// Malformed or out-of-contract frame.
    pub const INVALID_FRAME: u16 = 0x0003;

    /// Create a room-not-found error.
    pub fn room_not_found(room: impl Into<String>) -> Self {
        Self { code: Self::ROOM_NOT_FOUND, message: format!("room not found: {}", room.into()) }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self { code: Self::UNAUTHORIZED, message: reason.into() }
    }

    /// Create an invalid-frame error.
    pub fn invalid_frame(reason: impl Into<String>) -> Self {
        Self { code: Self::INVALID_FRAME, message: reason.into() }
    }
}
