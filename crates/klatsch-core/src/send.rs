//! Outbound message delivery.
//!
//! One send in flight at a time. Content is validated (non-blank after
//! trimming, then dispatched verbatim), correlated with the server's
//! acknowledgment by request id, and bounded by a timeout. There is no
//! store-and-forward: if the channel cannot carry the send right now the
//! submission fails immediately, and every failure path hands the original
//! content back so the caller can offer a retry.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use klatsch_proto::{Frame, Payload, events::MessageCreate};

use crate::{error::EngineError, room::RoomCode, session::SessionState};

/// Time allowed for the server to acknowledge a send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Terminal result of one submission.
///
/// Every non-delivered variant carries the submitted content back for a
/// retry affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Server acknowledged the send. The message itself arrives over the
    /// live channel like any other; there is no local echo.
    Delivered,

    /// Server rejected the send.
    Rejected {
        /// The content that was submitted.
        content: String,
        /// Server-supplied rejection reason.
        reason: String,
    },

    /// No acknowledgment within the timeout. Outcome on the server is
    /// unknown; the content is surfaced for an explicit user retry, never
    /// resent automatically.
    TimedOut {
        /// The content that was submitted.
        content: String,
    },

    /// Room view torn down while the send was in flight.
    Cancelled {
        /// The content that was submitted.
        content: String,
    },
}

/// One submission awaiting its acknowledgment.
#[derive(Debug, Clone)]
struct PendingSend<I> {
    request_id: u64,
    content: String,
    submitted_at: I,
}

/// Serializes outbound sends for one room.
///
/// Pure state machine like the session: callers supply time and the
/// request id (drawn from the environment's RNG) and execute the returned
/// frame themselves.
#[derive(Debug, Clone)]
pub struct SendCoordinator<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    room: RoomCode,
    author_id: String,
    timeout: Duration,
    pending: Option<PendingSend<I>>,
}

impl<I> SendCoordinator<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Coordinator for the given room and author with the default timeout.
    pub fn new(room: RoomCode, author_id: String) -> Self {
        Self::with_timeout(room, author_id, DEFAULT_SEND_TIMEOUT)
    }

    /// Coordinator with an explicit acknowledgment timeout.
    pub fn with_timeout(room: RoomCode, author_id: String, timeout: Duration) -> Self {
        Self { room, author_id, timeout, pending: None }
    }

    /// True while an acknowledgment is outstanding.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Submit content for delivery.
    ///
    /// Validation order is fixed: blank content is rejected before the
    /// busy and availability checks, so an empty submission never consumes
    /// the in-flight slot. Content is dispatched verbatim, untrimmed.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidInput` if the content is empty or whitespace
    /// - `EngineError::Busy` if a prior send is still unacknowledged
    /// - `EngineError::Unavailable` if the session is not joined
    pub fn submit(
        &mut self,
        content: String,
        session_state: SessionState,
        request_id: u64,
        now: I,
    ) -> Result<Frame, EngineError> {
        if content.trim().is_empty() {
            return Err(EngineError::InvalidInput {
                reason: "message content must not be blank".to_string(),
            });
        }

        if self.pending.is_some() {
            return Err(EngineError::Busy);
        }

        if session_state != SessionState::Joined {
            return Err(EngineError::Unavailable {
                reason: format!("live channel is {session_state:?}"),
            });
        }

        let frame = Payload::MessageCreate(MessageCreate {
            request_id,
            room: self.room.as_str().to_string(),
            content: content.clone(),
            author_id: self.author_id.clone(),
        })
        .into_frame()?;

        self.pending = Some(PendingSend { request_id, content, submitted_at: now });

        Ok(frame)
    }

    /// Process a server acknowledgment.
    ///
    /// Returns `None` for stale or unknown request ids, which are ignored
    /// without touching in-flight state. A stale ack can arrive after a
    /// timeout already resolved the submission.
    pub fn handle_ack(&mut self, request_id: u64, error: Option<String>) -> Option<SendOutcome> {
        let pending = self.pending.as_ref()?;
        if pending.request_id != request_id {
            return None;
        }

        let pending = self.pending.take()?;
        Some(match error {
            None => SendOutcome::Delivered,
            Some(reason) => SendOutcome::Rejected { content: pending.content, reason },
        })
    }

    /// Resolve a timed-out submission, if any.
    pub fn tick(&mut self, now: I) -> Option<SendOutcome> {
        let pending = self.pending.as_ref()?;
        if now - pending.submitted_at < self.timeout {
            return None;
        }

        let pending = self.pending.take()?;
        Some(SendOutcome::TimedOut { content: pending.content })
    }

    /// Resolve the in-flight submission on room teardown.
    pub fn cancel(&mut self) -> Option<SendOutcome> {
        let pending = self.pending.take()?;
        Some(SendOutcome::Cancelled { content: pending.content })
    }
}
