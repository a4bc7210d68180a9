//! Room client events and actions.

use klatsch_core::{EngineError, HistoryPage, RoomCode, SendOutcome, SessionState};
use klatsch_proto::Frame;

/// Events the caller feeds into the room client.
///
/// The caller is responsible for:
/// - Receiving frames from the transport
/// - Running history fetches and feeding results back
/// - Driving time forward via ticks
/// - Forwarding application intents (submit, close)
#[derive(Debug, Clone)]
pub enum RoomClientEvent {
    /// Enter the room: open the live channel and request the backlog.
    Open,

    /// Transport-level connection established.
    TransportConnected,

    /// Transport-level connection dropped.
    TransportLost,

    /// Frame received from the server.
    FrameReceived(Frame),

    /// A requested history page arrived.
    ///
    /// `room` echoes the [`RoomClientAction::FetchHistory`] request so a
    /// late response for a previously viewed room can be discarded.
    HistoryLoaded {
        /// Room the page was fetched for.
        room: RoomCode,
        /// The page.
        page: HistoryPage,
    },

    /// A requested history fetch failed.
    HistoryFailed {
        /// Room the fetch was for.
        room: RoomCode,
        /// Classified failure.
        error: EngineError,
    },

    /// Application wants to send a message.
    Submit {
        /// Message text, dispatched verbatim.
        content: String,
    },

    /// Time tick for timeout and reconnect processing.
    ///
    /// The caller should send ticks periodically so the client can detect
    /// join/send timeouts and fire due reconnects.
    Tick,

    /// Leave the room: deterministic teardown of channel and view.
    Close,
}

/// Actions the room client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomClientAction {
    /// Establish a transport connection for this room.
    OpenTransport,

    /// Send a frame to the server.
    SendFrame(Frame),

    /// Tear down the transport.
    CloseTransport {
        /// Reason for closing.
        reason: String,
    },

    /// Fetch one page of history from the room directory and feed the
    /// result back as `HistoryLoaded` or `HistoryFailed`.
    FetchHistory {
        /// Room to fetch for.
        room: RoomCode,
        /// 1-based page number.
        page: u32,
    },

    /// The room topic changed (or became known).
    TopicChanged(String),

    /// The conversation view gained at least one message; re-render.
    ConversationUpdated,

    /// An in-flight submission resolved.
    SubmitResolved(SendOutcome),

    /// The live-channel state changed; update connection indicators.
    SessionChanged(SessionState),

    /// A failure to surface to the user: history fetch failures and
    /// server-side channel rejections.
    ErrorSurfaced {
        /// Classified failure.
        error: EngineError,
    },

    /// Log message for debugging.
    Log {
        /// Log message.
        message: String,
    },
}
