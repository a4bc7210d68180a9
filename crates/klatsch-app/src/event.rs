//! Application input events and user intents.
//!
//! Inputs driving the [`crate::App`] state machine come from two sources:
//! user interactions delivered by the driver as [`UserIntent`], and
//! engine notifications translated by the bridge into [`AppEvent`].

use klatsch_core::{CurrentUser, Message, RoomCode, SendOutcome, SessionState};

/// User interactions, delivered by the driver.
#[derive(Debug, Clone)]
pub enum UserIntent {
    /// Create a fresh room and enter it.
    CreateRoom,

    /// Join a room by invite code. Raw input; validated by the App.
    JoinRoom {
        /// Invite code as typed, any case, possibly padded.
        input: String,
    },

    /// Send a message in the current room.
    Submit {
        /// Message text.
        content: String,
    },

    /// Copy the current room's invite code for sharing.
    CopyInvite,

    /// Leave the current room and return to the lobby.
    LeaveRoom,

    /// Quit the application.
    Quit,
}

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Identity resolved at startup.
    SignedIn {
        /// The signed-in user.
        user: CurrentUser,
    },

    /// No identity could be resolved; the room view must be abandoned.
    AuthRequired,

    /// A room was entered (created or joined); its code is now current.
    RoomEntered {
        /// Canonical code of the room.
        code: RoomCode,
    },

    /// The current room's topic changed or became known.
    TopicChanged {
        /// New topic.
        topic: String,
    },

    /// The conversation gained messages; `messages` is the full ordered
    /// view.
    ConversationChanged {
        /// Snapshot of the reconciled conversation.
        messages: Vec<Message>,
    },

    /// The live channel changed state.
    ChannelChanged {
        /// New channel state.
        state: SessionState,
    },

    /// The in-flight send resolved.
    SendResolved {
        /// How it resolved.
        outcome: SendOutcome,
    },

    /// A submission was refused before dispatch (blank, busy, channel
    /// unavailable). Nothing is in flight.
    SendRefused {
        /// Why it was refused.
        message: String,
    },

    /// The backlog fetch finished (successfully or not).
    LoadingFinished,

    /// Error to show the user.
    Error {
        /// Error description.
        message: String,
    },
}
