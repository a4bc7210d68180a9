//! Frame type: event kind header plus raw payload bytes.
//!
//! Layout on the wire:
//! `[kind: u16 BE] [payload_size: u32 BE] + [payload: variable bytes]`
//!
//! The header is raw binary so a relay can route frames without parsing
//! CBOR. `Frame` holds raw bytes, NOT the [`crate::Payload`] enum; use
//! `Payload::into_frame()` / `Payload::from_frame()` for the typed view.

use bytes::{BufMut, Bytes};

use crate::errors::{ProtocolError, Result};

/// Named event kinds carried over the live channel.
///
/// Each kind maps to exactly one payload type. Unknown kinds are rejected
/// during decode rather than silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EventKind {
    /// Client requests to join a room.
    JoinRoom = 0x0001,
    /// Server acknowledges a join; the session is live from here.
    JoinAck = 0x0002,
    /// Client requests creation of a message.
    MessageCreate = 0x0010,
    /// Server acknowledges (or rejects) a message-create request.
    MessageAck = 0x0011,
    /// Server broadcasts a persisted message to every joined participant.
    MessageCreated = 0x0012,
    /// Server-side error not tied to a specific request.
    Error = 0x00ff,
}

impl EventKind {
    /// Wire representation of this kind.
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Parse a wire value. `None` for kinds outside the contract.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::JoinRoom),
            0x0002 => Some(Self::JoinAck),
            0x0010 => Some(Self::MessageCreate),
            0x0011 => Some(Self::MessageAck),
            0x0012 => Some(Self::MessageCreated),
            0x00ff => Some(Self::Error),
            _ => None,
        }
    }
}

/// Complete protocol frame (transport layer).
///
/// # Invariants
///
/// - `payload.len()` always matches the size written in the header; both
///   [`Frame::encode`] and [`Frame::decode`] enforce this.
/// - `payload.len()` never exceeds [`Frame::MAX_PAYLOAD_SIZE`]; oversized
///   frames are rejected during encode and decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Event kind identifying the payload type.
    pub kind: EventKind,
    /// Raw payload bytes (already CBOR-encoded).
    pub payload: Bytes,
}

impl Frame {
    /// Header size on the wire: kind (2 bytes) + payload length (4 bytes).
    pub const HEADER_SIZE: usize = 6;

    /// Maximum payload size (1 MB). Chat messages are small; the limit
    /// exists to bound allocation from a malformed length field.
    pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

    /// Create a new frame.
    #[must_use]
    pub fn new(kind: EventKind, payload: impl Into<Bytes>) -> Self {
        Self { kind, payload: payload.into() }
    }

    /// Encode frame into a buffer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the payload exceeds
    ///   [`Frame::MAX_PAYLOAD_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        dst.put_u16(self.kind.to_u16());
        dst.put_u32(self.payload.len() as u32);
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Read the payload size out of an encoded header, for streaming
    /// readers that fetch the header before the payload.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if fewer than `HEADER_SIZE` bytes
    /// - `ProtocolError::UnknownEventKind` for kinds outside the contract
    /// - `ProtocolError::PayloadTooLarge` if the length field exceeds the
    ///   limit
    pub fn payload_size(header: &[u8]) -> Result<usize> {
        if header.len() < Self::HEADER_SIZE {
            return Err(ProtocolError::FrameTooShort {
                need: Self::HEADER_SIZE,
                have: header.len(),
            });
        }

        let kind_raw = u16::from_be_bytes([header[0], header[1]]);
        if EventKind::from_u16(kind_raw).is_none() {
            return Err(ProtocolError::UnknownEventKind(kind_raw));
        }

        let size = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
        if size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge { size, max: Self::MAX_PAYLOAD_SIZE });
        }

        Ok(size)
    }

    /// Decode a frame from wire format.
    ///
    /// Reads exactly `HEADER_SIZE + payload_size` bytes; trailing data is
    /// ignored. Does NOT parse CBOR; use [`crate::Payload::from_frame`]
    /// for the typed view.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if the buffer is truncated
    /// - `ProtocolError::UnknownEventKind` for kinds outside the contract
    /// - `ProtocolError::PayloadTooLarge` if the length field exceeds the
    ///   limit (checked before allocating)
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < Self::HEADER_SIZE {
            return Err(ProtocolError::FrameTooShort { need: Self::HEADER_SIZE, have: src.len() });
        }

        let kind_raw = u16::from_be_bytes([src[0], src[1]]);
        let kind = EventKind::from_u16(kind_raw)
            .ok_or(ProtocolError::UnknownEventKind(kind_raw))?;

        let payload_size = u32::from_be_bytes([src[2], src[3], src[4], src[5]]) as usize;
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size,
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        let total = Self::HEADER_SIZE + payload_size;
        if src.len() < total {
            return Err(ProtocolError::FrameTooShort { need: total, have: src.len() });
        }

        let payload = Bytes::copy_from_slice(&src[Self::HEADER_SIZE..total]);
        Ok(Self { kind, payload })
    }
}
