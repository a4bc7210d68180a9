//! Room client state machine.
//!
//! `RoomClient` is the top-level state machine for one room view. It owns
//! the three engine components for that room (channel session, send
//! coordinator, reconciler), feeds them from a single event stream, and
//! translates their outputs into actions for the driver. Switching rooms
//! means closing this client and constructing a new one.

use klatsch_core::{
    ChannelSession, ConversationView, CurrentUser, EngineError, Environment, HistoryPage,
    Reconciler, RoomCode, SendCoordinator, SessionConfig, SessionState, session::SessionAction,
};
use klatsch_proto::{
    Frame, Payload,
    events::{ErrorEvent, JoinAck, MessageAck, MessageCreated},
};

use crate::event::{RoomClientAction, RoomClientEvent};

/// Client for one room: live channel, history reconciliation, sends.
pub struct RoomClient<E: Environment> {
    /// Environment for time and request ids.
    env: E,

    /// The signed-in user.
    user: CurrentUser,

    /// Live-channel lifecycle.
    session: ChannelSession<E::Instant>,

    /// Outbound send serialization.
    coordinator: SendCoordinator<E::Instant>,

    /// History/live merge.
    reconciler: Reconciler,

    /// Room topic, known after the first history page or join ack.
    topic: Option<String>,

    /// True between requesting the backlog and its arrival.
    loading: bool,
}

impl<E: Environment> RoomClient<E> {
    /// Create a client for the given room, not yet opened.
    pub fn new(env: E, user: CurrentUser, room: RoomCode, auth_token: Option<String>) -> Self {
        Self::with_config(env, user, room, auth_token, SessionConfig::default())
    }

    /// Create a client with explicit session timings.
    pub fn with_config(
        env: E,
        user: CurrentUser,
        room: RoomCode,
        auth_token: Option<String>,
        config: SessionConfig,
    ) -> Self {
        let coordinator = SendCoordinator::new(room.clone(), user.id.clone());
        Self {
            env,
            user,
            session: ChannelSession::new(room, auth_token, config),
            coordinator,
            reconciler: Reconciler::new(),
            topic: None,
            loading: false,
        }
    }

    /// Room this client is bound to.
    pub fn room(&self) -> &RoomCode {
        self.session.room()
    }

    /// The signed-in user.
    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    /// Live-channel state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// The reconciled conversation.
    pub fn conversation(&self) -> &ConversationView {
        self.reconciler.view()
    }

    /// Room topic, if known yet.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// True while the initial backlog fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True while a send awaits its acknowledgment.
    pub fn is_sending(&self) -> bool {
        self.coordinator.is_busy()
    }

    /// Process an event and return resulting actions.
    pub fn handle(&mut self, event: RoomClientEvent) -> Result<Vec<RoomClientAction>, EngineError> {
        match event {
            RoomClientEvent::Open => self.handle_open(),
            RoomClientEvent::TransportConnected => self.handle_transport_connected(),
            RoomClientEvent::TransportLost => Ok(self.handle_transport_lost()),
            RoomClientEvent::FrameReceived(frame) => self.handle_frame(&frame),
            RoomClientEvent::HistoryLoaded { room, page } => Ok(self.handle_history(room, page)),
            RoomClientEvent::HistoryFailed { room, error } => {
                Ok(self.handle_history_failed(room, error))
            },
            RoomClientEvent::Submit { content } => self.handle_submit(content),
            RoomClientEvent::Tick => Ok(self.handle_tick()),
            RoomClientEvent::Close => Ok(self.handle_close()),
        }
    }

    fn handle_open(&mut self) -> Result<Vec<RoomClientAction>, EngineError> {
        let now = self.env.now();
        let mut actions = map_session_actions(self.session.open(now)?);

        // Backlog and channel race freely; the reconciler absorbs overlap.
        self.loading = true;
        actions.push(RoomClientAction::FetchHistory { room: self.room().clone(), page: 1 });
        actions.push(RoomClientAction::SessionChanged(self.session.state()));

        Ok(actions)
    }

    fn handle_transport_connected(&mut self) -> Result<Vec<RoomClientAction>, EngineError> {
        let now = self.env.now();
        Ok(map_session_actions(self.session.transport_connected(now)?))
    }

    fn handle_transport_lost(&mut self) -> Vec<RoomClientAction> {
        let before = self.session.state();
        let now = self.env.now();
        let mut actions = map_session_actions(self.session.transport_lost(now));

        let after = self.session.state();
        if after != before {
            actions.push(RoomClientAction::SessionChanged(after));
        }
        actions.push(RoomClientAction::Log {
            message: format!("transport lost, channel now {after:?}"),
        });
        actions
    }

    fn handle_frame(&mut self, frame: &Frame) -> Result<Vec<RoomClientAction>, EngineError> {
        match Payload::from_frame(frame)? {
            Payload::JoinAck(ack) => self.handle_join_ack(ack),
            Payload::MessageAck(ack) => Ok(self.handle_message_ack(&ack)),
            Payload::MessageCreated(created) => Ok(self.handle_message_created(created)),
            Payload::Error(error) => Ok(self.handle_error_event(error)),
            other @ (Payload::JoinRoom(_) | Payload::MessageCreate(_)) => {
                Err(EngineError::Protocol(format!(
                    "client-bound stream carried a client-to-server event: {:?}",
                    other.kind()
                )))
            },
        }
    }

    fn handle_join_ack(&mut self, ack: JoinAck) -> Result<Vec<RoomClientAction>, EngineError> {
        if ack.room != self.room().as_str() {
            return Ok(vec![RoomClientAction::Log {
                message: format!("discarding join ack for stale room {}", ack.room),
            }]);
        }

        let now = self.env.now();
        self.session.handle_join_ack(now)?;

        let mut actions = vec![RoomClientAction::SessionChanged(SessionState::Joined)];
        if let Some(topic) = ack.topic
            && self.topic.as_deref() != Some(topic.as_str())
        {
            self.topic = Some(topic.clone());
            actions.push(RoomClientAction::TopicChanged(topic));
        }
        Ok(actions)
    }

    fn handle_message_ack(&mut self, ack: &MessageAck) -> Vec<RoomClientAction> {
        match self.coordinator.handle_ack(ack.request_id, ack.error.clone()) {
            Some(outcome) => vec![RoomClientAction::SubmitResolved(outcome)],
            None => vec![RoomClientAction::Log {
                message: format!("ignoring stale ack for request {}", ack.request_id),
            }],
        }
    }

    fn handle_message_created(&mut self, created: MessageCreated) -> Vec<RoomClientAction> {
        // Room isolation: a push for any other room is dropped, never
        // rendered. Can occur briefly around a room switch.
        if created.room != self.room().as_str() {
            return vec![RoomClientAction::Log {
                message: format!("discarding push for room {}", created.room),
            }];
        }

        if self.reconciler.ingest_live_push(created.message.into()) {
            vec![RoomClientAction::ConversationUpdated]
        } else {
            vec![]
        }
    }

    fn handle_error_event(&mut self, error: ErrorEvent) -> Vec<RoomClientAction> {
        let mapped = match error.code {
            ErrorEvent::ROOM_NOT_FOUND => {
                EngineError::NotFound { code: self.room().as_str().to_string() }
            },
            ErrorEvent::UNAUTHORIZED => EngineError::Unauthorized { reason: error.message },
            code => EngineError::Protocol(format!("server error {code:#06x}: {}", error.message)),
        };

        // Membership rejections are not retryable over this channel; tear
        // it down rather than letting the backoff loop hammer the server.
        let mut actions = Vec::new();
        if matches!(mapped, EngineError::NotFound { .. } | EngineError::Unauthorized { .. }) {
            actions.extend(map_session_actions(self.session.close()));
            actions.push(RoomClientAction::SessionChanged(self.session.state()));
        }
        actions.push(RoomClientAction::ErrorSurfaced { error: mapped });
        actions
    }

    fn handle_history(&mut self, room: RoomCode, page: HistoryPage) -> Vec<RoomClientAction> {
        if room != *self.room() {
            return vec![RoomClientAction::Log {
                message: format!("discarding history page for stale room {room}"),
            }];
        }

        self.loading = false;

        let mut actions = Vec::new();
        if self.topic.as_deref() != Some(page.topic.as_str()) {
            self.topic = Some(page.topic.clone());
            actions.push(RoomClientAction::TopicChanged(page.topic));
        }
        if self.reconciler.ingest_history_page(page.messages) > 0 {
            actions.push(RoomClientAction::ConversationUpdated);
        }
        actions
    }

    fn handle_history_failed(&mut self, room: RoomCode, error: EngineError) -> Vec<RoomClientAction> {
        if room != *self.room() {
            return vec![RoomClientAction::Log {
                message: format!("discarding history failure for stale room {room}"),
            }];
        }

        self.loading = false;
        vec![RoomClientAction::ErrorSurfaced { error }]
    }

    fn handle_submit(&mut self, content: String) -> Result<Vec<RoomClientAction>, EngineError> {
        let now = self.env.now();
        let request_id = self.env.random_u64();
        let frame = self.coordinator.submit(content, self.session.state(), request_id, now)?;
        Ok(vec![RoomClientAction::SendFrame(frame)])
    }

    fn handle_tick(&mut self) -> Vec<RoomClientAction> {
        let before = self.session.state();
        let now = self.env.now();

        let mut actions = map_session_actions(self.session.tick(now));

        let after = self.session.state();
        if after != before {
            actions.push(RoomClientAction::SessionChanged(after));
        }

        if let Some(outcome) = self.coordinator.tick(now) {
            actions.push(RoomClientAction::SubmitResolved(outcome));
        }

        actions
    }

    fn handle_close(&mut self) -> Vec<RoomClientAction> {
        let mut actions = Vec::new();

        // Resolve the in-flight send first so its content is not lost.
        if let Some(outcome) = self.coordinator.cancel() {
            actions.push(RoomClientAction::SubmitResolved(outcome));
        }

        self.reconciler.clear();
        self.topic = None;
        self.loading = false;

        actions.extend(map_session_actions(self.session.close()));
        actions.push(RoomClientAction::SessionChanged(SessionState::Disconnected));
        actions
    }
}

fn map_session_actions(actions: Vec<SessionAction>) -> Vec<RoomClientAction> {
    actions
        .into_iter()
        .map(|action| match action {
            SessionAction::OpenTransport => RoomClientAction::OpenTransport,
            SessionAction::SendFrame(frame) => RoomClientAction::SendFrame(frame),
            SessionAction::CloseTransport { reason } => RoomClientAction::CloseTransport { reason },
        })
        .collect()
}
