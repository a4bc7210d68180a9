//! Scenario world: App, Bridge, scripted server, and directory wired
//! together with explicit frame delivery.
//!
//! Unlike the runtime-plus-[`crate::SimDriver`] path, the world holds
//! server replies in an inbox until the test delivers them, so tests can
//! interleave history responses and live pushes in any order and observe
//! every intermediate state.

use std::collections::VecDeque;

use klatsch_app::{App, AppAction, AppEvent, Bridge, TransportOp, UserIntent};
use klatsch_core::{
    CurrentUser, EngineError, RoomCode, RoomDirectory,
    env::test_utils::MockEnv,
    history::DEFAULT_PAGE_SIZE,
};
use klatsch_proto::Frame;

use crate::{
    backend::MemoryBackend,
    directory::MemoryDirectory,
    server::{ScriptedServer, ServerReply},
};

/// Everything a synchronization scenario needs, with virtual time.
pub struct SyncWorld {
    /// Virtual clock shared with the engine.
    pub env: MockEnv,
    /// Shared room store.
    pub backend: MemoryBackend,
    /// Directory and identity provider.
    pub directory: MemoryDirectory,
    /// Frame-level server.
    pub server: ScriptedServer,
    app: App,
    bridge: Bridge<MockEnv>,
    transport_up: bool,
    inbox: VecDeque<Frame>,
    clipboard: Option<String>,
    redirected: bool,
}

impl SyncWorld {
    /// World with a signed-in default user.
    #[must_use]
    pub fn new() -> Self {
        let env = MockEnv::new();
        let backend = MemoryBackend::new();
        let user = CurrentUser { id: "u1".to_string(), display_name: "Ada".to_string() };
        let directory = MemoryDirectory::signed_in(backend.clone(), user.clone());
        let server = ScriptedServer::new(backend.clone());

        let mut app = App::new();
        let _ = app.handle(AppEvent::SignedIn { user });

        Self {
            env: env.clone(),
            backend,
            directory,
            server,
            app,
            bridge: Bridge::new(env),
            transport_up: false,
            inbox: VecDeque::new(),
            clipboard: None,
            redirected: false,
        }
    }

    /// The view model under test.
    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    /// True while the simulated transport is up.
    #[must_use]
    pub fn transport_up(&self) -> bool {
        self.transport_up
    }

    /// Last clipboard contents, if anything was copied.
    #[must_use]
    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    /// True once control went to the sign-in flow.
    #[must_use]
    pub fn redirected_to_sign_in(&self) -> bool {
        self.redirected
    }

    /// Frames waiting to be delivered to the client.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.inbox.len()
    }

    /// Feed a user interaction through the App.
    pub async fn intent(&mut self, intent: UserIntent) {
        let actions = self.app.intent(intent);
        self.drain(actions).await;
    }

    /// Deliver the oldest held server frame.
    pub async fn deliver_next(&mut self) {
        if let Some(frame) = self.inbox.pop_front() {
            let events = self.bridge.handle_frame(frame);
            self.apply_events(events).await;
        }
    }

    /// Deliver every held server frame in order.
    pub async fn deliver_all(&mut self) {
        while self.pending_frames() > 0 {
            self.deliver_next().await;
        }
    }

    /// Deliver a hand-built frame, bypassing the server.
    pub async fn inject_frame(&mut self, frame: Frame) {
        let events = self.bridge.handle_frame(frame);
        self.apply_events(events).await;
    }

    /// Drop the transport out from under the client.
    pub async fn lose_transport(&mut self) {
        self.transport_up = false;
        self.inbox.clear();
        let events = self.bridge.transport_lost();
        self.apply_events(events).await;
    }

    /// Advance the virtual clock.
    pub fn advance(&mut self, duration: std::time::Duration) {
        self.env.advance(duration);
    }

    /// Run one maintenance tick.
    pub async fn tick(&mut self) {
        let events = self.bridge.handle_tick();
        self.apply_events(events).await;
    }

    async fn apply_events(&mut self, events: Vec<AppEvent>) {
        let mut actions = Vec::new();
        for event in events {
            actions.extend(self.app.handle(event));
        }
        self.drain(actions).await;
    }

    /// Run actions and the I/O they cause to quiescence.
    async fn drain(&mut self, initial: Vec<AppAction>) {
        let mut actions = initial;
        loop {
            let mut events = Vec::new();
            for action in std::mem::take(&mut actions) {
                events.extend(self.execute(action).await);
            }
            events.extend(self.flush().await);
            if events.is_empty() {
                break;
            }
            for event in events {
                actions.extend(self.app.handle(event));
            }
        }
    }

    async fn execute(&mut self, action: AppAction) -> Vec<AppEvent> {
        match action {
            AppAction::Render | AppAction::Quit => vec![],
            AppAction::RedirectToSignIn => {
                self.redirected = true;
                vec![]
            },
            AppAction::CopyToClipboard { text } => {
                self.clipboard = Some(text);
                vec![]
            },
            AppAction::CreateRoom => match self.directory.create_room_code().await {
                Ok(code) => self.enter(code),
                Err(EngineError::Unauthenticated) => vec![AppEvent::AuthRequired],
                Err(e) => vec![AppEvent::Error { message: e.to_string() }],
            },
            AppAction::JoinRoom { code } => match self.directory.join_room_code(&code).await {
                Ok(()) => self.enter(code),
                Err(EngineError::Unauthenticated) => vec![AppEvent::AuthRequired],
                Err(e) => vec![AppEvent::Error { message: e.to_string() }],
            },
            AppAction::LeaveRoom => self.bridge.leave_room(),
            AppAction::SubmitMessage { content } => self.bridge.submit(content),
        }
    }

    fn enter(&mut self, code: RoomCode) -> Vec<AppEvent> {
        let user = CurrentUser { id: "u1".to_string(), display_name: "Ada".to_string() };
        self.bridge.enter_room(user, code, None)
    }

    /// Execute pending bridge I/O, returning the events it produced.
    async fn flush(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        loop {
            let ops = self.bridge.take_transport_ops();
            let frames = self.bridge.take_outgoing();
            let fetches = self.bridge.take_fetches();
            if ops.is_empty() && frames.is_empty() && fetches.is_empty() {
                break;
            }

            for op in ops {
                match op {
                    TransportOp::Open => {
                        self.transport_up = true;
                        events.extend(self.bridge.transport_connected());
                    },
                    TransportOp::Close { .. } => {
                        self.transport_up = false;
                    },
                }
            }

            for frame in frames {
                if self.transport_up {
                    for reply in self.server.handle_frame(&frame) {
                        match reply {
                            ServerReply::ToSender(f)
                            | ServerReply::Broadcast { frame: f, .. } => {
                                self.inbox.push_back(f);
                            },
                        }
                    }
                }
            }

            for (room, page) in fetches {
                match self.directory.fetch_page(&room, page, DEFAULT_PAGE_SIZE).await {
                    Ok(history) => events.extend(self.bridge.history_loaded(room, history)),
                    Err(error) => events.extend(self.bridge.history_failed(room, error)),
                }
            }
        }
        events
    }
}

impl Default for SyncWorld {
    fn default() -> Self {
        Self::new()
    }
}
