//! Observable application state types.
//!
//! The "view model" for the application: the subset of engine state
//! necessary for rendering without exposing protocol mechanics.

use klatsch_core::{Message, RoomCode, SessionState};

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Landing screen: create a room or join by invite code.
    Lobby,
    /// Inside a room.
    Room,
}

/// State of the currently viewed room.
#[derive(Debug, Clone)]
pub struct RoomView {
    /// The room's invite code.
    pub code: RoomCode,
    /// Topic, once known.
    pub topic: Option<String>,
    /// The reconciled conversation, in display order.
    pub messages: Vec<Message>,
    /// Live-channel state for the connection indicator.
    pub channel: SessionState,
    /// True while the initial backlog is loading.
    pub loading: bool,
    /// True while a send awaits acknowledgment; the composer stays
    /// enabled but further submissions are refused until it resolves.
    pub sending: bool,
    /// Content of the last failed send, offered for retry.
    pub failed_send: Option<String>,
}

impl RoomView {
    /// Fresh view for a room just entered.
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            topic: None,
            messages: Vec::new(),
            channel: SessionState::Disconnected,
            loading: true,
            sending: false,
            failed_send: None,
        }
    }
}
