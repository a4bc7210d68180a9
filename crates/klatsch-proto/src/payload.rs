//! Typed view over frame payloads.
//!
//! Frame headers are raw binary for cheap routing, but payloads use CBOR
//! for type safety and forward compatibility. The payload type is
//! determined by the [`EventKind`] in the frame header, so only the inner
//! struct is serialized (no variant tag in the CBOR). A kind/payload
//! mismatch is therefore impossible to construct on the wire.
//!
//! # Invariants
//!
//! - Each variant maps to exactly one [`EventKind`] (enforced by match
//!   exhaustiveness in `kind()`, `encode()`, and `decode()`).
//! - Round-trip encoding produces an equivalent value.

use bytes::BufMut;

use crate::{
    EventKind, Frame,
    errors::{ProtocolError, Result},
    events,
};

/// All possible frame payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Join-room request.
    JoinRoom(events::JoinRoom),
    /// Join acknowledgment.
    JoinAck(events::JoinAck),
    /// Message-create request.
    MessageCreate(events::MessageCreate),
    /// Message-create acknowledgment.
    MessageAck(events::MessageAck),
    /// Persisted-message broadcast.
    MessageCreated(events::MessageCreated),
    /// Error event.
    Error(events::ErrorEvent),
}

impl Payload {
    /// Event kind corresponding to this payload type.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::JoinRoom(_) => EventKind::JoinRoom,
            Self::JoinAck(_) => EventKind::JoinAck,
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::MessageAck(_) => EventKind::MessageAck,
            Self::MessageCreated(_) => EventKind::MessageCreated,
            Self::Error(_) => EventKind::Error,
        }
    }

    /// Encode the payload into a buffer.
    ///
    /// Serializes only the inner struct, NOT the variant tag; the frame
    /// header's event kind already identifies the payload type.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();

        match self {
            Self::JoinRoom(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::JoinAck(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::MessageCreate(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::MessageAck(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::MessageCreated(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Error(inner) => ciborium::ser::into_writer(inner, &mut writer),
        }
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode a payload from bytes based on the event kind.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` before any CBOR parsing begins
    /// - `ProtocolError::CborDecode` if deserialization fails
    pub fn decode(kind: EventKind, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > Frame::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: Frame::MAX_PAYLOAD_SIZE,
            });
        }

        fn read<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
            ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
        }

        Ok(match kind {
            EventKind::JoinRoom => Self::JoinRoom(read(bytes)?),
            EventKind::JoinAck => Self::JoinAck(read(bytes)?),
            EventKind::MessageCreate => Self::MessageCreate(read(bytes)?),
            EventKind::MessageAck => Self::MessageAck(read(bytes)?),
            EventKind::MessageCreated => Self::MessageCreated(read(bytes)?),
            EventKind::Error => Self::Error(read(bytes)?),
        })
    }

    /// Encode this payload into a complete [`Frame`].
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn into_frame(self) -> Result<Frame> {
        let kind = self.kind();
        let mut payload = Vec::new();
        self.encode(&mut payload)?;
        Ok(Frame::new(kind, payload))
    }

    /// Decode the typed payload from a [`Frame`].
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborDecode` if deserialization fails
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        Self::decode(frame.kind, &frame.payload)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn join_room_frame_roundtrip() {
        let payload = Payload::JoinRoom(events::JoinRoom {
            room: "AB12CD".to_string(),
            auth_token: Some("bearer-token".to_string()),
        });

        let frame = payload.clone().into_frame().unwrap();
        assert_eq!(frame.kind, EventKind::JoinRoom);

        let decoded = Payload::from_frame(&frame).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn message_created_frame_roundtrip() {
        let timestamp = chrono::Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let payload = Payload::MessageCreated(events::MessageCreated {
            room: "AB12CD".to_string(),
            message: events::WireMessage {
                id: "m-001".to_string(),
                author_id: "u-42".to_string(),
                author_label: "ada".to_string(),
                content: "hello".to_string(),
                timestamp,
            },
        });

        let frame = payload.clone().into_frame().unwrap();
        let decoded = Payload::from_frame(&frame).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn mismatched_kind_fails_decode() {
        let payload = Payload::MessageAck(events::MessageAck { request_id: 7, error: None });
        let frame = payload.into_frame().unwrap();

        // JoinAck expects a struct with a `room` field; the ack bytes lack it.
        let result = Payload::decode(EventKind::JoinAck, &frame.payload);
        assert!(matches!(result, Err(ProtocolError::CborDecode(_))));
    }
}
