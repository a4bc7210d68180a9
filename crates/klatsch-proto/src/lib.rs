//! Wire contract for the Klatsch live event channel.
//!
//! The live channel is a persistent bidirectional connection carrying named
//! events. Each event travels as a [`Frame`]: a fixed binary header (event
//! kind + payload length, big endian) followed by a CBOR-encoded payload.
//!
//! # Components
//!
//! - [`Frame`] / [`EventKind`]: transport-layer packet and event routing
//! - [`Payload`]: typed view over all event payloads
//! - [`events`]: the individual payload structs
//!
//! The room code format is part of this contract: exactly six ASCII
//! alphanumeric characters, canonicalized to uppercase before any request.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
pub mod events;
mod frame;
mod payload;

pub use errors::{ProtocolError, Result};
pub use frame::{EventKind, Frame};
pub use payload::Payload;
