//! End-to-end scenarios for the room client, driven with a virtual clock.

use chrono::{TimeZone, Utc};
use klatsch_client::{
    CurrentUser, EngineError, RoomClient, RoomClientAction, RoomClientEvent, SendOutcome,
    SessionState,
};
use klatsch_core::{
    HistoryPage, Message, RoomCode,
    env::test_utils::MockEnv,
    send::DEFAULT_SEND_TIMEOUT,
    session::DEFAULT_RECONNECT_BASE,
};
use klatsch_proto::{
    Frame, Payload,
    events::{ErrorEvent, JoinAck, MessageAck, MessageCreated, WireMessage},
};

fn user() -> CurrentUser {
    CurrentUser { id: "u1".to_string(), display_name: "Ada".to_string() }
}

fn room() -> RoomCode {
    RoomCode::parse("AB12CD").unwrap()
}

fn client(env: &MockEnv) -> RoomClient<MockEnv> {
    RoomClient::new(env.clone(), user(), room(), Some("token".to_string()))
}

fn wire_msg(id: &str, secs: i64) -> WireMessage {
    WireMessage {
        id: id.to_string(),
        author_id: "u2".to_string(),
        author_label: "Grace".to_string(),
        content: format!("msg {id}"),
        timestamp: Utc.timestamp_opt(secs, 0).single().unwrap(),
    }
}

fn msg(id: &str, secs: i64) -> Message {
    wire_msg(id, secs).into()
}

fn join_ack_frame(room: &str, topic: Option<&str>) -> Frame {
    Payload::JoinAck(JoinAck { room: room.to_string(), topic: topic.map(String::from) })
        .into_frame()
        .unwrap()
}

fn push_frame(room: &str, message: WireMessage) -> Frame {
    Payload::MessageCreated(MessageCreated { room: room.to_string(), message })
        .into_frame()
        .unwrap()
}

/// Drive a freshly constructed client to `Joined`.
fn join(client: &mut RoomClient<MockEnv>) {
    client.handle(RoomClientEvent::Open).unwrap();
    client.handle(RoomClientEvent::TransportConnected).unwrap();
    client
        .handle(RoomClientEvent::FrameReceived(join_ack_frame("AB12CD", Some("coffee"))))
        .unwrap();
    assert_eq!(client.state(), SessionState::Joined);
}

/// Pull the submitted request id back out of the emitted frame.
fn submitted_request_id(actions: &[RoomClientAction]) -> u64 {
    for action in actions {
        if let RoomClientAction::SendFrame(frame) = action
            && let Ok(Payload::MessageCreate(create)) = Payload::from_frame(frame)
        {
            return create.request_id;
        }
    }
    panic!("no MessageCreate frame in {actions:?}");
}

fn view_ids(client: &RoomClient<MockEnv>) -> Vec<String> {
    client.conversation().messages().iter().map(|m| m.id.clone()).collect()
}

#[test]
fn open_starts_channel_and_backlog_in_parallel() {
    let env = MockEnv::new();
    let mut c = client(&env);

    let actions = c.handle(RoomClientEvent::Open).unwrap();

    assert!(actions.contains(&RoomClientAction::OpenTransport));
    assert!(actions.contains(&RoomClientAction::FetchHistory { room: room(), page: 1 }));
    assert!(c.is_loading());
    assert_eq!(c.state(), SessionState::Connecting);
}

#[test]
fn join_ack_carries_the_topic() {
    let env = MockEnv::new();
    let mut c = client(&env);
    c.handle(RoomClientEvent::Open).unwrap();
    c.handle(RoomClientEvent::TransportConnected).unwrap();

    let actions = c
        .handle(RoomClientEvent::FrameReceived(join_ack_frame("AB12CD", Some("coffee"))))
        .unwrap();

    assert!(actions.contains(&RoomClientAction::SessionChanged(SessionState::Joined)));
    assert!(actions.contains(&RoomClientAction::TopicChanged("coffee".to_string())));
    assert_eq!(c.topic(), Some("coffee"));
}

#[test]
fn history_and_live_pushes_merge_into_one_ordered_view() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);

    // Backlog arrives with m1 and m2.
    c.handle(RoomClientEvent::HistoryLoaded {
        room: room(),
        page: HistoryPage { topic: "coffee".to_string(), messages: vec![msg("m1", 10), msg("m2", 20)] },
    })
    .unwrap();
    assert!(!c.is_loading());

    // m2 raced the fetch and also arrives live: dropped, no re-render.
    let actions =
        c.handle(RoomClientEvent::FrameReceived(push_frame("AB12CD", wire_msg("m2", 20)))).unwrap();
    assert!(!actions.contains(&RoomClientAction::ConversationUpdated));

    // m3 is older than m2 and slots between.
    let actions =
        c.handle(RoomClientEvent::FrameReceived(push_frame("AB12CD", wire_msg("m3", 15)))).unwrap();
    assert!(actions.contains(&RoomClientAction::ConversationUpdated));

    assert_eq!(view_ids(&c), vec!["m1", "m3", "m2"]);
}

#[test]
fn pushes_for_other_rooms_are_discarded() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);

    let actions =
        c.handle(RoomClientEvent::FrameReceived(push_frame("ZZ99ZZ", wire_msg("mx", 5)))).unwrap();

    assert!(!actions.contains(&RoomClientAction::ConversationUpdated));
    assert!(c.conversation().is_empty());
}

#[test]
fn stale_history_responses_are_discarded() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);

    let stale = RoomCode::parse("ZZ99ZZ").unwrap();
    c.handle(RoomClientEvent::HistoryLoaded {
        room: stale,
        page: HistoryPage { topic: "old".to_string(), messages: vec![msg("mx", 5)] },
    })
    .unwrap();

    assert!(c.conversation().is_empty());
    assert_ne!(c.topic(), Some("old"));
}

#[test]
fn submit_delivers_without_local_echo() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);

    let actions = c.handle(RoomClientEvent::Submit { content: "hello".to_string() }).unwrap();
    let request_id = submitted_request_id(&actions);
    assert!(c.is_sending());

    let ack = Payload::MessageAck(MessageAck { request_id, error: None }).into_frame().unwrap();
    let actions = c.handle(RoomClientEvent::FrameReceived(ack)).unwrap();

    assert!(actions.contains(&RoomClientAction::SubmitResolved(SendOutcome::Delivered)));
    assert!(!c.is_sending());
    // No speculative insertion: the message only appears via the push.
    assert!(c.conversation().is_empty());

    c.handle(RoomClientEvent::FrameReceived(push_frame("AB12CD", wire_msg("m1", 30)))).unwrap();
    assert_eq!(view_ids(&c), vec!["m1"]);
}

#[test]
fn blank_submission_is_rejected() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);

    let result = c.handle(RoomClientEvent::Submit { content: "   ".to_string() });
    assert!(matches!(result, Err(EngineError::InvalidInput { .. })));
    assert!(!c.is_sending());
}

#[test]
fn second_submission_while_pending_is_busy() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);

    c.handle(RoomClientEvent::Submit { content: "first".to_string() }).unwrap();
    let result = c.handle(RoomClientEvent::Submit { content: "second".to_string() });
    assert!(matches!(result, Err(EngineError::Busy)));
}

#[test]
fn submission_while_reconnecting_fails_fast() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);

    c.handle(RoomClientEvent::TransportLost).unwrap();
    assert_eq!(c.state(), SessionState::Reconnecting);

    let result = c.handle(RoomClientEvent::Submit { content: "hello".to_string() });
    assert!(matches!(result, Err(EngineError::Unavailable { .. })));
}

#[test]
fn reconnect_fires_after_backoff_and_preserves_the_view() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);
    c.handle(RoomClientEvent::FrameReceived(push_frame("AB12CD", wire_msg("m1", 10)))).unwrap();

    c.handle(RoomClientEvent::TransportLost).unwrap();

    env.advance(DEFAULT_RECONNECT_BASE);
    let actions = c.handle(RoomClientEvent::Tick).unwrap();
    assert!(actions.contains(&RoomClientAction::OpenTransport));

    c.handle(RoomClientEvent::TransportConnected).unwrap();
    c.handle(RoomClientEvent::FrameReceived(join_ack_frame("AB12CD", Some("coffee")))).unwrap();

    // The view survives the reconnect; no gap-fill is requested.
    assert_eq!(c.state(), SessionState::Joined);
    assert_eq!(view_ids(&c), vec!["m1"]);
}

#[test]
fn send_timeout_returns_the_content() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);

    c.handle(RoomClientEvent::Submit { content: "hello".to_string() }).unwrap();

    env.advance(DEFAULT_SEND_TIMEOUT);
    let actions = c.handle(RoomClientEvent::Tick).unwrap();

    assert!(actions.contains(&RoomClientAction::SubmitResolved(SendOutcome::TimedOut {
        content: "hello".to_string(),
    })));
    assert!(!c.is_sending());
}

#[test]
fn server_rejection_tears_the_channel_down() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);

    let frame = Payload::Error(ErrorEvent::unauthorized("not a member")).into_frame().unwrap();
    let actions = c.handle(RoomClientEvent::FrameReceived(frame)).unwrap();

    assert_eq!(c.state(), SessionState::Disconnected);
    assert!(actions.iter().any(|a| matches!(
        a,
        RoomClientAction::ErrorSurfaced { error: EngineError::Unauthorized { .. } }
    )));
}

#[test]
fn close_cancels_the_in_flight_send_and_clears_the_view() {
    let env = MockEnv::new();
    let mut c = client(&env);
    join(&mut c);
    c.handle(RoomClientEvent::FrameReceived(push_frame("AB12CD", wire_msg("m1", 10)))).unwrap();
    c.handle(RoomClientEvent::Submit { content: "hello".to_string() }).unwrap();

    let actions = c.handle(RoomClientEvent::Close).unwrap();

    assert!(actions.contains(&RoomClientAction::SubmitResolved(SendOutcome::Cancelled {
        content: "hello".to_string(),
    })));
    assert!(actions.iter().any(|a| matches!(a, RoomClientAction::CloseTransport { .. })));
    assert_eq!(c.state(), SessionState::Disconnected);
    assert!(c.conversation().is_empty());
    assert_eq!(c.topic(), None);
}
