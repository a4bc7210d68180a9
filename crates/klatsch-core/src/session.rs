//! Live-channel session state machine.
//!
//! Manages the lifecycle of the event-channel connection for exactly one
//! room: connect, join, receive, disconnect, reconnect. Uses the action
//! pattern: methods take time as input and return actions for the driver
//! to execute. This keeps the state machine pure (no I/O) and makes
//! reconnect/backoff testable in isolation.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  open()   ┌────────────┐  join ack   ┌────────┐
//! │ Disconnected │──────────>│ Connecting │────────────>│ Joined │
//! └──────────────┘           └────────────┘             └────────┘
//!        ↑                         │ loss/timeout            │ transport loss
//!        │ retry ceiling           ↓                         ↓
//!        │                   ┌──────────────┐   backoff, retry ceiling
//!        └───────────────────│ Reconnecting │<──────────┘
//!                            └──────────────┘
//! ```
//!
//! While `Reconnecting`, sends fail fast with `Unavailable` rather than
//! queuing: no store-and-forward. On rejoin the session does NOT request a
//! gap-fill; the caller re-runs the history fetcher if a gap is suspected.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use klatsch_proto::{Frame, Payload, events::JoinRoom};

use crate::{error::EngineError, room::RoomCode};

/// Time allowed for one connect-plus-join attempt to reach `Joined`.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Initial reconnect backoff delay.
pub const DEFAULT_RECONNECT_BASE: Duration = Duration::from_millis(500);

/// Upper bound for the reconnect backoff delay.
pub const DEFAULT_RECONNECT_MAX: Duration = Duration::from_secs(15);

/// Reconnect attempts before the session goes terminally `Disconnected`.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 6;

/// Actions returned by the session state machine.
///
/// The driver (runtime or test harness) executes these:
/// - `OpenTransport`: establish a fresh transport-level connection
/// - `SendFrame`: serialize and send the frame over the transport
/// - `CloseTransport`: tear the transport down with the given reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Establish a transport connection for this session's room.
    OpenTransport,

    /// Send this frame to the server.
    SendFrame(Frame),

    /// Tear down the transport.
    CloseTransport {
        /// Reason for closing.
        reason: String,
    },
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No live channel. Initial state, and terminal after the retry
    /// ceiling; leaving it requires an explicit `open()`.
    Disconnected,
    /// Transport connect and join request in flight, awaiting the
    /// server's join acknowledgment.
    Connecting,
    /// Join acknowledged; the channel is live and sends are permitted.
    Joined,
    /// Transport lost; retrying the connect+join sequence with backoff.
    Reconnecting,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Timeout for one connect+join attempt.
    pub join_timeout: Duration,
    /// Initial backoff delay.
    pub reconnect_base: Duration,
    /// Backoff delay cap.
    pub reconnect_max: Duration,
    /// Retry ceiling before terminal disconnect.
    pub max_reconnect_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            reconnect_base: DEFAULT_RECONNECT_BASE,
            reconnect_max: DEFAULT_RECONNECT_MAX,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// Live-channel session bound to one room.
///
/// Pure state machine: no I/O, time passed as parameters. Generic over
/// `Instant` to support both real time and virtual time in tests.
///
/// # Invariants
///
/// - Exactly one session may be `Joined` to a given room from a given
///   client at a time; switching rooms closes this session (transport
///   fully torn down) before a new one is opened.
#[derive(Debug, Clone)]
pub struct ChannelSession<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Current state.
    state: SessionState,
    /// Room this session is bound to.
    room: RoomCode,
    /// Bearer credential forwarded in the join request.
    auth_token: Option<String>,
    /// Configuration.
    config: SessionConfig,
    /// Completed connect+join failures since the last successful join.
    attempt: u32,
    /// When the current connect+join attempt started. `None` when no
    /// attempt is in flight.
    connect_started: Option<I>,
    /// When the current backoff wait started. `None` when not waiting.
    wait_started: Option<I>,
}

impl<I> ChannelSession<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a new session in [`SessionState::Disconnected`].
    pub fn new(room: RoomCode, auth_token: Option<String>, config: SessionConfig) -> Self {
        Self {
            state: SessionState::Disconnected,
            room,
            auth_token,
            config,
            attempt: 0,
            connect_started: None,
            wait_started: None,
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Room this session is bound to.
    #[must_use]
    pub fn room(&self) -> &RoomCode {
        &self.room
    }

    /// True when the channel can carry a send right now.
    #[must_use]
    pub fn can_send(&self) -> bool {
        self.state == SessionState::Joined
    }

    /// Completed connect failures since the last successful join.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Begin the connect+join sequence.
    ///
    /// Also the explicit user-triggered retry out of a terminal
    /// `Disconnected`.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidState` if not `Disconnected`
    pub fn open(&mut self, now: I) -> Result<Vec<SessionAction>, EngineError> {
        if self.state != SessionState::Disconnected {
            return Err(EngineError::InvalidState {
                state: self.state,
                operation: "open".to_string(),
            });
        }

        self.state = SessionState::Connecting;
        self.attempt = 0;
        self.connect_started = Some(now);
        self.wait_started = None;

        Ok(vec![SessionAction::OpenTransport])
    }

    /// Transport-level connection established; emit the join request.
    ///
    /// The session stays in its current state until the server
    /// acknowledges the join.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidState` if no connect attempt is in flight
    pub fn transport_connected(&mut self, now: I) -> Result<Vec<SessionAction>, EngineError> {
        if !matches!(self.state, SessionState::Connecting | SessionState::Reconnecting) {
            return Err(EngineError::InvalidState {
                state: self.state,
                operation: "transport_connected".to_string(),
            });
        }

        self.connect_started = Some(now);
        self.wait_started = None;

        let join = Payload::JoinRoom(JoinRoom {
            room: self.room.as_str().to_string(),
            auth_token: self.auth_token.clone(),
        });
        let frame = join.into_frame()?;

        Ok(vec![SessionAction::SendFrame(frame)])
    }

    /// Server acknowledged the join; the channel is live.
    ///
    /// Resets the retry counter. The session does NOT gap-fill here; a
    /// rejoin after loss leaves any missed pushes to an explicit re-fetch
    /// by the caller.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidState` if no join was pending
    pub fn handle_join_ack(&mut self, _now: I) -> Result<(), EngineError> {
        if !matches!(self.state, SessionState::Connecting | SessionState::Reconnecting) {
            return Err(EngineError::InvalidState {
                state: self.state,
                operation: "handle_join_ack".to_string(),
            });
        }

        self.state = SessionState::Joined;
        self.attempt = 0;
        self.connect_started = None;
        self.wait_started = None;

        Ok(())
    }

    /// Transport connection dropped.
    ///
    /// Schedules a backoff retry, or goes terminally `Disconnected` once
    /// the retry ceiling is reached. A loss while already `Disconnected`
    /// is a no-op.
    pub fn transport_lost(&mut self, now: I) -> Vec<SessionAction> {
        if self.state == SessionState::Disconnected {
            return vec![];
        }

        self.schedule_retry(now);
        vec![]
    }

    /// Process periodic maintenance: join timeouts and due reconnects.
    pub fn tick(&mut self, now: I) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        // A connect+join attempt that never reached Joined counts as a loss.
        if let Some(started) = self.connect_started
            && now - started > self.config.join_timeout
        {
            actions.push(SessionAction::CloseTransport {
                reason: format!("join timeout after {:?}", now - started),
            });
            self.schedule_retry(now);
            return actions;
        }

        if self.state == SessionState::Reconnecting
            && let Some(waited_since) = self.wait_started
            && now - waited_since >= self.current_delay()
        {
            self.wait_started = None;
            self.connect_started = Some(now);
            actions.push(SessionAction::OpenTransport);
        }

        actions
    }

    /// Deterministic teardown.
    ///
    /// Must complete before a session for another room is opened, to
    /// prevent cross-room message delivery.
    pub fn close(&mut self) -> Vec<SessionAction> {
        let was_active = self.state != SessionState::Disconnected;

        self.state = SessionState::Disconnected;
        self.attempt = 0;
        self.connect_started = None;
        self.wait_started = None;

        if was_active {
            vec![SessionAction::CloseTransport { reason: "session closed".to_string() }]
        } else {
            vec![]
        }
    }

    /// Record a connect failure and either wait for the next retry or go
    /// terminal.
    fn schedule_retry(&mut self, now: I) {
        self.attempt = self.attempt.saturating_add(1);
        self.connect_started = None;

        if self.attempt > self.config.max_reconnect_attempts {
            // Retry ceiling reached: surface a terminal Disconnected that
            // requires an explicit user-triggered open().
            self.state = SessionState::Disconnected;
            self.wait_started = None;
        } else {
            self.state = SessionState::Reconnecting;
            self.wait_started = Some(now);
        }
    }

    /// Backoff delay for the current attempt: base doubled per failure,
    /// capped at the configured maximum.
    fn current_delay(&self) -> Duration {
        let exponent = self.attempt.saturating_sub(1).min(16);
        let delay = self.config.reconnect_base.saturating_mul(1u32 << exponent);
        delay.min(self.config.reconnect_max)
    }
}
