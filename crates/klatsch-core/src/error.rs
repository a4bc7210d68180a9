//! Error taxonomy for the synchronization engine.
//!
//! Strongly-typed outcomes for every fallible engine operation. The engine
//! never silently drops a detected error: local recovery is limited to
//! channel reconnection, everything else propagates to the presentation
//! layer classified by one of these variants.
//!
//! We avoid `std::io::Error` for engine logic to maintain type safety and
//! enable proper recovery decisions.

use thiserror::Error;

use crate::session::SessionState;

/// Errors produced by the synchronization engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Caller-correctable input problem; no network effect occurred.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the input.
        reason: String,
    },

    /// No resolvable identity; the caller should abandon the room view and
    /// hand control back to the external auth flow.
    #[error("not authenticated")]
    Unauthenticated,

    /// Caller is not a member of the room.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Why access was denied.
        reason: String,
    },

    /// Room code does not resolve.
    #[error("room not found: {code}")]
    NotFound {
        /// The code that failed to resolve.
        code: String,
    },

    /// Temporary network or backend condition; the caller may retry.
    #[error("transient failure: {reason}")]
    Transient {
        /// Underlying condition.
        reason: String,
    },

    /// The live channel cannot carry the operation right now. Surfaced
    /// immediately for sends; never queued.
    #[error("unavailable: {reason}")]
    Unavailable {
        /// Why the channel is unavailable.
        reason: String,
    },

    /// Room view torn down mid-operation. Swallowed by the caller, never
    /// surfaced to the user.
    #[error("operation cancelled")]
    Cancelled,

    /// A prior operation is still in flight; the caller must wait for it
    /// to resolve.
    #[error("busy: send already in flight")]
    Busy,

    /// Wire-contract violation from the peer.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid session state transition attempted.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Session state when the error occurred.
        state: SessionState,
        /// Operation that was attempted.
        operation: String,
    },
}

impl EngineError {
    /// Returns true if the operation may succeed on retry.
    ///
    /// Transient and unavailable conditions are retryable. Input problems,
    /// authorization failures, and protocol violations are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Unavailable { .. })
    }

    /// Returns true if the error is internal housekeeping that should not
    /// reach the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<klatsch_proto::ProtocolError> for EngineError {
    fn from(err: klatsch_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}
