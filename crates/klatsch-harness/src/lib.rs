//! Deterministic test harness for the room synchronization stack.
//!
//! In-memory implementations of the directory, the event-channel server,
//! and the runtime driver, all sharing one [`MemoryBackend`] store so the
//! request/response path and the live channel observe the same rooms.
//!
//! # Scenario testing
//!
//! [`SyncWorld`] wires an `App` and `Bridge` to the scripted server with
//! explicit frame delivery, letting tests interleave history responses and
//! live pushes in any order. [`SimDriver`] instead plugs into the full
//! `Runtime` for end-to-end flows.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod directory;
pub mod server;
pub mod sim_driver;
pub mod world;

pub use backend::{MemoryBackend, RoomRecord};
pub use directory::MemoryDirectory;
pub use server::{ScriptedServer, ServerReply};
pub use sim_driver::SimDriver;
pub use world::SyncWorld;
