//! Full-stack synchronization scenarios over the in-memory world.
//!
//! Each test drives App, Bridge, and the engine through the scripted
//! server and directory, controlling frame delivery and virtual time.

use chrono::{TimeZone, Utc};
use klatsch_app::UserIntent;
use klatsch_core::{
    Message, RoomCode, SessionState,
    send::DEFAULT_SEND_TIMEOUT,
    session::DEFAULT_RECONNECT_BASE,
};
use klatsch_harness::SyncWorld;
use klatsch_proto::{
    Frame, Payload,
    events::MessageCreated,
};

fn msg(id: &str, secs: i64, content: &str) -> Message {
    Message {
        id: id.to_string(),
        author_id: "u2".to_string(),
        author_label: "Grace".to_string(),
        content: content.to_string(),
        timestamp: Utc.timestamp_opt(secs, 0).single().unwrap(),
    }
}

fn push_frame(room: &str, id: &str, secs: i64, content: &str) -> Frame {
    Payload::MessageCreated(MessageCreated {
        room: room.to_string(),
        message: msg(id, secs, content).into(),
    })
    .into_frame()
    .unwrap()
}

fn view_ids(world: &SyncWorld) -> Vec<String> {
    world
        .app()
        .room()
        .map(|v| v.messages.iter().map(|m| m.id.clone()).collect())
        .unwrap_or_default()
}

/// Create a room, enter it, and settle the join handshake.
async fn entered_world() -> (SyncWorld, RoomCode) {
    let mut world = SyncWorld::new();
    world.intent(UserIntent::CreateRoom).await;
    let code = world.app().room().expect("in room").code.clone();
    world.deliver_all().await;
    assert_eq!(world.app().channel_state(), Some(SessionState::Joined));
    (world, code)
}

#[tokio::test]
async fn creating_a_room_joins_its_channel_and_loads_the_backlog() {
    let mut world = SyncWorld::new();

    world.intent(UserIntent::CreateRoom).await;

    let view = world.app().room().expect("room view");
    assert_eq!(view.channel, SessionState::Connecting);
    // The backlog fetch resolved during the same drain; the join ack is
    // still in flight.
    assert!(!view.loading);
    assert_eq!(world.pending_frames(), 1);

    world.deliver_all().await;
    let view = world.app().room().expect("room view");
    assert_eq!(view.channel, SessionState::Joined);
    assert_eq!(view.topic.as_deref(), Some("New room"));
}

#[tokio::test]
async fn backlog_and_live_pushes_merge_into_one_ordered_view() {
    let mut world = SyncWorld::new();
    let code = world.backend.create_room("coffee");
    world.backend.append_message(&code, msg("m1", 10, "first"));
    world.backend.append_message(&code, msg("m2", 20, "second"));

    world.intent(UserIntent::JoinRoom { input: code.as_str().to_string() }).await;
    world.deliver_all().await;
    assert_eq!(view_ids(&world), vec!["m1", "m2"]);

    // m2 raced the backlog fetch and also arrives live, then m3 slots
    // between the two by timestamp.
    world.inject_frame(push_frame(code.as_str(), "m2", 20, "second")).await;
    world.inject_frame(push_frame(code.as_str(), "m3", 15, "between")).await;

    assert_eq!(view_ids(&world), vec!["m1", "m3", "m2"]);
}

#[tokio::test]
async fn join_input_is_trimmed_and_uppercased() {
    let mut world = SyncWorld::new();
    // Walk the sequential code space until one carries a letter.
    let code = (0..11)
        .map(|_| world.backend.create_room("coffee"))
        .find(|c| c.as_str().chars().any(|ch| ch.is_ascii_alphabetic()))
        .expect("codes reach 00000A within eleven rooms");

    let input = format!("  {}  ", code.as_str().to_lowercase());
    world.intent(UserIntent::JoinRoom { input }).await;

    assert_eq!(world.app().room().expect("room view").code, code);
}

#[tokio::test]
async fn joining_an_unknown_code_stays_in_the_lobby() {
    let mut world = SyncWorld::new();

    world.intent(UserIntent::JoinRoom { input: "ZZ99ZZ".to_string() }).await;

    assert!(world.app().room().is_none());
    assert!(world.app().status_message().is_some());
}

#[tokio::test]
async fn submission_is_confirmed_before_it_appears() {
    let (mut world, code) = entered_world().await;

    world.intent(UserIntent::Submit { content: "hello".to_string() }).await;

    // The write reached the store, but nothing is rendered until the
    // server's own copy comes back.
    assert_eq!(world.backend.messages(&code).unwrap().len(), 1);
    assert!(view_ids(&world).is_empty());
    assert!(world.app().room().unwrap().sending);

    // Ack first, then the broadcast copy.
    world.deliver_next().await;
    assert!(!world.app().room().unwrap().sending);
    assert!(view_ids(&world).is_empty());

    world.deliver_next().await;
    assert_eq!(view_ids(&world), vec!["m0001"]);
    assert!(world.app().room().unwrap().failed_send.is_none());
}

#[tokio::test]
async fn blank_submission_never_reaches_the_server() {
    let (mut world, code) = entered_world().await;

    world.intent(UserIntent::Submit { content: "   ".to_string() }).await;

    assert!(world.backend.messages(&code).unwrap().is_empty());
    assert!(!world.app().room().unwrap().sending);
    assert_eq!(world.app().status_message(), Some("Message must not be empty"));
}

#[tokio::test]
async fn second_submission_waits_for_the_first() {
    let (mut world, code) = entered_world().await;

    world.intent(UserIntent::Submit { content: "first".to_string() }).await;
    world.intent(UserIntent::Submit { content: "second".to_string() }).await;

    assert_eq!(world.backend.messages(&code).unwrap().len(), 1);
    assert_eq!(world.app().status_message(), Some("Still sending the previous message"));
}

#[tokio::test]
async fn submission_while_reconnecting_is_refused() {
    let (mut world, code) = entered_world().await;
    world.lose_transport().await;
    assert_eq!(world.app().channel_state(), Some(SessionState::Reconnecting));

    world.intent(UserIntent::Submit { content: "hello".to_string() }).await;

    assert!(world.backend.messages(&code).unwrap().is_empty());
    assert!(!world.app().room().unwrap().sending);
    assert!(world.app().status_message().is_some());
}

#[tokio::test]
async fn pushes_for_other_rooms_are_ignored() {
    let (mut world, _code) = entered_world().await;

    world.inject_frame(push_frame("ZZ99ZZ", "mx", 5, "noise")).await;

    assert!(view_ids(&world).is_empty());
}

#[tokio::test]
async fn reconnect_after_backoff_preserves_the_view() {
    let (mut world, code) = entered_world().await;
    world.inject_frame(push_frame(code.as_str(), "m1", 10, "kept")).await;

    world.lose_transport().await;

    // Before the backoff elapses a tick does nothing.
    world.tick().await;
    assert!(!world.transport_up());

    world.advance(DEFAULT_RECONNECT_BASE);
    world.tick().await;
    assert!(world.transport_up());

    world.deliver_all().await;
    assert_eq!(world.app().channel_state(), Some(SessionState::Joined));
    assert_eq!(view_ids(&world), vec!["m1"]);

    // The rejoined channel carries sends again.
    world.intent(UserIntent::Submit { content: "back".to_string() }).await;
    world.deliver_all().await;
    assert_eq!(world.backend.messages(&code).unwrap().len(), 1);
    assert_eq!(view_ids(&world).len(), 2);
}

#[tokio::test]
async fn lost_confirmation_times_out_with_the_content() {
    let (mut world, code) = entered_world().await;
    world.server.set_drop_acks(true);

    world.intent(UserIntent::Submit { content: "hello".to_string() }).await;
    assert_eq!(world.backend.messages(&code).unwrap().len(), 1);

    world.advance(DEFAULT_SEND_TIMEOUT);
    world.tick().await;

    let view = world.app().room().unwrap();
    assert!(!view.sending);
    assert_eq!(view.failed_send.as_deref(), Some("hello"));
}

#[tokio::test]
async fn rejected_submission_keeps_the_content_for_retry() {
    let (mut world, code) = entered_world().await;
    world.server.reject_next("rate limited");

    world.intent(UserIntent::Submit { content: "hello".to_string() }).await;
    world.deliver_all().await;

    assert!(world.backend.messages(&code).unwrap().is_empty());
    let view = world.app().room().unwrap();
    assert_eq!(view.failed_send.as_deref(), Some("hello"));
    assert!(world.app().status_message().unwrap().contains("rate limited"));
}

#[tokio::test]
async fn failed_backlog_fetch_surfaces_and_finishes_loading() {
    let mut world = SyncWorld::new();
    let code = world.backend.create_room("coffee");
    world.directory.fail_fetches(1);

    world.intent(UserIntent::JoinRoom { input: code.as_str().to_string() }).await;

    let view = world.app().room().expect("room view");
    assert!(!view.loading);
    assert!(world.app().status_message().unwrap().contains("Error"));
}

#[tokio::test]
async fn identity_loss_redirects_to_sign_in() {
    let mut world = SyncWorld::new();
    let code = world.backend.create_room("coffee");
    world.directory.sign_out();

    world.intent(UserIntent::JoinRoom { input: code.as_str().to_string() }).await;

    assert!(world.redirected_to_sign_in());
    assert!(world.app().room().is_none());
}

#[tokio::test]
async fn copy_invite_puts_the_code_on_the_clipboard() {
    let (mut world, code) = entered_world().await;

    world.intent(UserIntent::CopyInvite).await;

    assert_eq!(world.clipboard(), Some(code.as_str()));
}

#[tokio::test]
async fn leaving_tears_the_channel_down_and_keeps_the_store() {
    let (mut world, code) = entered_world().await;
    world.intent(UserIntent::Submit { content: "hello".to_string() }).await;
    world.deliver_all().await;

    world.intent(UserIntent::LeaveRoom).await;

    assert!(world.app().room().is_none());
    assert!(!world.transport_up());
    assert_eq!(world.backend.messages(&code).unwrap().len(), 1);
}

#[tokio::test]
async fn switching_rooms_isolates_the_views() {
    let mut world = SyncWorld::new();
    let first = world.backend.create_room("first");
    let second = world.backend.create_room("second");
    world.backend.append_message(&first, msg("a1", 10, "in first"));
    world.backend.append_message(&second, msg("b1", 10, "in second"));

    world.intent(UserIntent::JoinRoom { input: first.as_str().to_string() }).await;
    world.deliver_all().await;
    assert_eq!(view_ids(&world), vec!["a1"]);

    world.intent(UserIntent::JoinRoom { input: second.as_str().to_string() }).await;
    world.deliver_all().await;

    assert_eq!(world.app().room().expect("room view").code, second);
    assert_eq!(view_ids(&world), vec!["b1"]);
}
