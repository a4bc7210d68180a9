//! Application side-effects and intents.
//!
//! [`AppAction`] instructions are produced by the [`crate::App`] state
//! machine for the runtime to execute.

use klatsch_core::RoomCode;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Ask the room directory for a fresh room, then enter it.
    CreateRoom,

    /// Validate membership and enter the room. The code is already
    /// canonical; the App rejects malformed input before emitting this.
    JoinRoom {
        /// Canonical room code.
        code: RoomCode,
    },

    /// Tear down the current room view.
    LeaveRoom,

    /// Submit a message over the live channel.
    SubmitMessage {
        /// Message text, passed through verbatim.
        content: String,
    },

    /// Put the invite code on the clipboard.
    CopyToClipboard {
        /// Text to copy.
        text: String,
    },

    /// Hand control to the external sign-in flow.
    RedirectToSignIn,
}
