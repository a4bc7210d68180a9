//! End-to-end runtime flows over the queue-backed driver.
//!
//! The driver loops every sent frame through a scripted server, so a
//! scripted intent sequence exercises the full stack: identity, room
//! entry, channel join, sends, and shutdown.

use klatsch_app::{Runtime, Screen, UserIntent};
use klatsch_core::{CurrentUser, SessionState, env::test_utils::MockEnv};
use klatsch_harness::{MemoryBackend, MemoryDirectory, ScriptedServer, SimDriver};

fn user() -> CurrentUser {
    CurrentUser { id: "u1".to_string(), display_name: "Ada".to_string() }
}

#[tokio::test]
async fn scripted_session_creates_a_room_and_delivers_a_message() {
    let backend = MemoryBackend::new();
    let directory = MemoryDirectory::signed_in(backend.clone(), user());
    let driver = SimDriver::with_loopback(ScriptedServer::new(backend.clone()));

    driver.push_intent(UserIntent::CreateRoom);
    driver.push_intent(UserIntent::Submit { content: "hello".to_string() });
    // One idle-ish cycle so the broadcast copy drains before shutdown.
    driver.push_intent(UserIntent::CopyInvite);
    driver.push_intent(UserIntent::Quit);

    let runtime = Runtime::new(driver.clone(), MockEnv::new(), directory, None);
    runtime.run().await.expect("runtime");

    let app = driver.last_snapshot().expect("rendered at least once");
    let view = app.room().expect("room view");
    assert_eq!(view.channel, SessionState::Joined);
    assert_eq!(view.messages.len(), 1);
    assert_eq!(view.messages[0].content, "hello");
    assert!(!view.sending);
    assert!(view.failed_send.is_none());

    assert_eq!(driver.clipboard().as_deref(), Some(view.code.as_str()));
    assert!(driver.stopped());
}

#[tokio::test]
async fn unresolved_identity_goes_to_sign_in_without_a_loop() {
    let backend = MemoryBackend::new();
    let directory = MemoryDirectory::signed_out(backend);
    let driver = SimDriver::new();

    let runtime = Runtime::new(driver.clone(), MockEnv::new(), directory, None);
    runtime.run().await.expect("runtime");

    assert!(driver.redirected_to_sign_in());
    assert!(driver.last_snapshot().is_none());
}

#[tokio::test]
async fn failed_connect_leaves_the_channel_reconnecting() {
    let backend = MemoryBackend::new();
    let directory = MemoryDirectory::signed_in(backend.clone(), user());
    let driver = SimDriver::with_loopback(ScriptedServer::new(backend));
    driver.fail_connects(1);

    driver.push_intent(UserIntent::CreateRoom);
    driver.push_intent(UserIntent::Quit);

    let runtime = Runtime::new(driver.clone(), MockEnv::new(), directory, None);
    runtime.run().await.expect("runtime");

    // The clock never advances, so the backoff cannot fire before quit.
    let app = driver.last_snapshot().expect("rendered at least once");
    assert_eq!(app.room().expect("room view").channel, SessionState::Reconnecting);
}

#[tokio::test]
async fn leaving_returns_to_the_lobby_before_quit() {
    let backend = MemoryBackend::new();
    let directory = MemoryDirectory::signed_in(backend.clone(), user());
    let driver = SimDriver::with_loopback(ScriptedServer::new(backend));

    driver.push_intent(UserIntent::CreateRoom);
    driver.push_intent(UserIntent::LeaveRoom);
    driver.push_intent(UserIntent::Quit);

    let runtime = Runtime::new(driver.clone(), MockEnv::new(), directory, None);
    runtime.run().await.expect("runtime");

    let app = driver.last_snapshot().expect("rendered at least once");
    assert_eq!(app.screen(), Screen::Lobby);
    assert!(app.room().is_none());
}
