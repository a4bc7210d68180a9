//! Room message synchronization engine.
//!
//! The core reconciles two message sources into one authoritative view per
//! room: a paginated history fetched over request/response, and messages
//! pushed live over the event channel. Everything here is Sans-IO and
//! action-based: state machines consume events, time is passed in as a
//! parameter, and actions come back for a driver to execute.
//!
//! # Components
//!
//! - [`session::ChannelSession`]: live-channel lifecycle state machine
//!   (connect, join, reconnect with backoff, teardown)
//! - [`reconcile::Reconciler`]: merges history pages and live pushes into a
//!   single ordered, duplicate-free [`reconcile::ConversationView`]
//! - [`send::SendCoordinator`]: outgoing message dispatch and acknowledgment
//!   tracking, without speculative local insertion
//! - [`history`]: the Room Directory and Identity Provider contracts
//! - [`env::Environment`]: time/randomness abstraction for deterministic
//!   testing

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod history;
pub mod reconcile;
pub mod room;
pub mod send;
pub mod session;

pub use env::Environment;
pub use error::EngineError;
pub use history::{HistoryFetcher, HistoryPage, IdentityProvider, RoomDirectory};
pub use reconcile::{ConversationView, Reconciler};
pub use room::{CurrentUser, Message, RoomCode, chronological};
pub use send::{SendCoordinator, SendOutcome};
pub use session::{ChannelSession, SessionAction, SessionConfig, SessionState};
