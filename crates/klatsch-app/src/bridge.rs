//! Engine-to-application translation layer.
//!
//! The [`Bridge`] wraps the low-level [`klatsch_client::RoomClient`] and
//! adapts it to the high-level application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts high-level [`crate::AppAction`] submissions into room client
//!   events.
//! - Accumulates outgoing [`klatsch_proto::Frame`]s, history fetch
//!   requests, and transport operations for the driver's next I/O cycle.
//! - Interprets room client actions and converts them back into
//!   [`crate::AppEvent`]s to update the UI.

use klatsch_client::{RoomClient, RoomClientAction, RoomClientEvent};
use klatsch_core::{CurrentUser, EngineError, Environment, HistoryPage, RoomCode};
use klatsch_proto::Frame;

use crate::AppEvent;

/// Transport operation for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    /// Establish a connection for the current room.
    Open,
    /// Tear the connection down.
    Close {
        /// Reason for closing.
        reason: String,
    },
}

/// Bridge between App and the room engine.
///
/// Generic over Environment to support both production and simulation.
pub struct Bridge<E: Environment> {
    env: E,
    client: Option<RoomClient<E>>,
    outgoing: Vec<Frame>,
    fetches: Vec<(RoomCode, u32)>,
    transport_ops: Vec<TransportOp>,
}

impl<E: Environment> Bridge<E> {
    /// Create a bridge with no room entered.
    pub fn new(env: E) -> Self {
        Self {
            env,
            client: None,
            outgoing: Vec::new(),
            fetches: Vec::new(),
            transport_ops: Vec::new(),
        }
    }

    /// True while a room view is live.
    pub fn in_room(&self) -> bool {
        self.client.is_some()
    }

    /// Code of the current room, if any.
    pub fn room(&self) -> Option<&RoomCode> {
        self.client.as_ref().map(RoomClient::room)
    }

    /// Enter a room: build a fresh client and open its channel.
    ///
    /// Any previous room view is closed first; the engine requires the
    /// old channel to be fully torn down before a new one opens.
    pub fn enter_room(
        &mut self,
        user: CurrentUser,
        code: RoomCode,
        auth_token: Option<String>,
    ) -> Vec<AppEvent> {
        let mut events = self.leave_room();

        let mut client = RoomClient::new(self.env.clone(), user, code.clone(), auth_token);
        let result = client.handle(RoomClientEvent::Open);
        self.client = Some(client);

        events.push(AppEvent::RoomEntered { code });
        events.extend(self.handle_result(result));
        events
    }

    /// Leave the current room, if any.
    pub fn leave_room(&mut self) -> Vec<AppEvent> {
        let Some(mut client) = self.client.take() else {
            return vec![];
        };
        // Client is dropped; only transport teardown survives it.
        let result = client.handle(RoomClientEvent::Close);
        self.handle_result(result)
    }

    /// Submit a message in the current room.
    pub fn submit(&mut self, content: String) -> Vec<AppEvent> {
        let Some(client) = self.client.as_mut() else {
            return vec![];
        };
        match client.handle(RoomClientEvent::Submit { content }) {
            Ok(actions) => self.process_client_actions(actions),
            Err(EngineError::Unauthenticated) => vec![AppEvent::AuthRequired],
            Err(e) => vec![AppEvent::SendRefused { message: e.to_string() }],
        }
    }

    /// Transport established; the client emits its join request.
    pub fn transport_connected(&mut self) -> Vec<AppEvent> {
        self.feed(RoomClientEvent::TransportConnected)
    }

    /// Transport dropped.
    pub fn transport_lost(&mut self) -> Vec<AppEvent> {
        self.feed(RoomClientEvent::TransportLost)
    }

    /// Handle a frame from the server.
    pub fn handle_frame(&mut self, frame: Frame) -> Vec<AppEvent> {
        self.feed(RoomClientEvent::FrameReceived(frame))
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self) -> Vec<AppEvent> {
        self.feed(RoomClientEvent::Tick)
    }

    /// Feed back a completed history fetch.
    pub fn history_loaded(&mut self, room: RoomCode, page: HistoryPage) -> Vec<AppEvent> {
        let mut events = self.feed(RoomClientEvent::HistoryLoaded { room, page });
        events.push(AppEvent::LoadingFinished);
        events
    }

    /// Feed back a failed history fetch.
    pub fn history_failed(&mut self, room: RoomCode, error: EngineError) -> Vec<AppEvent> {
        let mut events = self.feed(RoomClientEvent::HistoryFailed { room, error });
        events.push(AppEvent::LoadingFinished);
        events
    }

    /// Take pending outgoing frames.
    pub fn take_outgoing(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.outgoing)
    }

    /// Take pending history fetch requests (room, page).
    pub fn take_fetches(&mut self) -> Vec<(RoomCode, u32)> {
        std::mem::take(&mut self.fetches)
    }

    /// Take pending transport operations.
    pub fn take_transport_ops(&mut self) -> Vec<TransportOp> {
        std::mem::take(&mut self.transport_ops)
    }

    fn feed(&mut self, event: RoomClientEvent) -> Vec<AppEvent> {
        let Some(client) = self.client.as_mut() else {
            return vec![];
        };
        let result = client.handle(event);
        self.handle_result(result)
    }

    fn handle_result(
        &mut self,
        result: Result<Vec<RoomClientAction>, EngineError>,
    ) -> Vec<AppEvent> {
        match result {
            Ok(actions) => self.process_client_actions(actions),
            Err(EngineError::Unauthenticated) => vec![AppEvent::AuthRequired],
            Err(e) if e.is_silent() => vec![],
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        }
    }

    fn process_client_actions(&mut self, actions: Vec<RoomClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                RoomClientAction::OpenTransport => {
                    self.transport_ops.push(TransportOp::Open);
                },
                RoomClientAction::SendFrame(frame) => {
                    self.outgoing.push(frame);
                },
                RoomClientAction::CloseTransport { reason } => {
                    self.transport_ops.push(TransportOp::Close { reason });
                },
                RoomClientAction::FetchHistory { room, page } => {
                    self.fetches.push((room, page));
                },
                RoomClientAction::TopicChanged(topic) => {
                    events.push(AppEvent::TopicChanged { topic });
                },
                RoomClientAction::ConversationUpdated => {
                    if let Some(client) = self.client.as_ref() {
                        events.push(AppEvent::ConversationChanged {
                            messages: client.conversation().messages().to_vec(),
                        });
                    }
                },
                RoomClientAction::SubmitResolved(outcome) => {
                    events.push(AppEvent::SendResolved { outcome });
                },
                RoomClientAction::SessionChanged(state) => {
                    events.push(AppEvent::ChannelChanged { state });
                },
                RoomClientAction::ErrorSurfaced { error } => match error {
                    EngineError::Unauthenticated => events.push(AppEvent::AuthRequired),
                    e => events.push(AppEvent::Error { message: e.to_string() }),
                },
                RoomClientAction::Log { message } => {
                    tracing::debug!(%message, "room client");
                },
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use klatsch_core::env::test_utils::MockEnv;
    use klatsch_proto::{
        Payload,
        events::{JoinAck, MessageCreated, WireMessage},
    };

    use super::*;

    fn user() -> CurrentUser {
        CurrentUser { id: "u1".into(), display_name: "Ada".into() }
    }

    fn code() -> RoomCode {
        RoomCode::parse("AB12CD").unwrap()
    }

    fn joined_bridge(env: &MockEnv) -> Bridge<MockEnv> {
        let mut bridge = Bridge::new(env.clone());
        let _ = bridge.enter_room(user(), code(), None);
        let _ = bridge.transport_connected();
        let ack = Payload::JoinAck(JoinAck { room: "AB12CD".into(), topic: Some("coffee".into()) })
            .into_frame()
            .unwrap();
        let _ = bridge.handle_frame(ack);
        bridge
    }

    #[test]
    fn entering_a_room_requests_transport_and_backlog() {
        let env = MockEnv::new();
        let mut bridge = Bridge::new(env);

        let events = bridge.enter_room(user(), code(), None);

        assert!(events.iter().any(|e| matches!(e, AppEvent::RoomEntered { .. })));
        assert_eq!(bridge.take_transport_ops(), vec![TransportOp::Open]);
        assert_eq!(bridge.take_fetches(), vec![(code(), 1)]);
    }

    #[test]
    fn live_push_surfaces_a_conversation_snapshot() {
        let env = MockEnv::new();
        let mut bridge = joined_bridge(&env);

        let push = Payload::MessageCreated(MessageCreated {
            room: "AB12CD".into(),
            message: WireMessage {
                id: "m1".into(),
                author_id: "u2".into(),
                author_label: "Grace".into(),
                content: "hi".into(),
                timestamp: Utc.timestamp_opt(10, 0).single().unwrap(),
            },
        })
        .into_frame()
        .unwrap();

        let events = bridge.handle_frame(push);
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::ConversationChanged { messages } if messages.len() == 1
        )));
    }

    #[test]
    fn submission_produces_an_outgoing_frame() {
        let env = MockEnv::new();
        let mut bridge = joined_bridge(&env);
        let _ = bridge.take_outgoing();

        let events = bridge.submit("hello".into());
        assert!(!events.iter().any(|e| matches!(e, AppEvent::SendRefused { .. })));
        assert_eq!(bridge.take_outgoing().len(), 1);
    }

    #[test]
    fn refused_submission_reports_without_a_frame() {
        let env = MockEnv::new();
        let mut bridge = Bridge::new(env.clone());
        let _ = bridge.enter_room(user(), code(), None);
        // Channel still connecting: the engine refuses the send.

        let events = bridge.submit("hello".into());
        assert!(events.iter().any(|e| matches!(e, AppEvent::SendRefused { .. })));
        assert!(bridge.take_outgoing().is_empty());
    }

    #[test]
    fn unauthenticated_history_failure_requires_auth() {
        let env = MockEnv::new();
        let mut bridge = joined_bridge(&env);

        let events = bridge.history_failed(code(), EngineError::Unauthenticated);
        assert!(events.iter().any(|e| matches!(e, AppEvent::AuthRequired)));
    }

    #[test]
    fn leaving_tears_the_transport_down() {
        let env = MockEnv::new();
        let mut bridge = joined_bridge(&env);
        let _ = bridge.take_transport_ops();

        let _ = bridge.leave_room();
        assert!(!bridge.in_room());
        assert!(
            bridge.take_transport_ops().iter().any(|op| matches!(op, TransportOp::Close { .. }))
        );
    }
}
