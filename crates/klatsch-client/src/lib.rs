//! Room client
//!
//! Action-based client state machine for one Klatsch room view. Wires the
//! engine components from [`klatsch_core`] (channel session, send
//! coordinator, reconciler) behind a single event stream.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and action-based patterns as
//! [`klatsch_core`]. It receives events ([`RoomClientEvent`]), processes
//! them through pure state machine logic, and returns actions
//! ([`RoomClientAction`]) for the caller to execute.
//!
//! # Components
//!
//! - [`RoomClient`]: state machine for one room view
//! - [`RoomClientEvent`]: events fed into the client
//! - [`RoomClientAction`]: actions produced by the client
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedTransport`]: QUIC connection with frame channels
//! - [`transport::connect`]: connect to a server

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod event;

#[cfg(feature = "transport")]
pub mod transport;

pub use client::RoomClient;
pub use event::{RoomClientAction, RoomClientEvent};
pub use klatsch_core::{
    CurrentUser, EngineError, Environment, Message, RoomCode, SendOutcome, SessionState,
};
