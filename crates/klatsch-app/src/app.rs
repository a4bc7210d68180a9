//! Application state machine.
//!
//! [`App`] manages the interactive state of the application completely
//! decoupled from I/O and protocol mechanics. It is a pure state machine:
//! it consumes [`UserIntent`] and [`AppEvent`] inputs and produces
//! [`AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Tracks the current screen, the signed-in user, and the room view.
//! - Validates invite codes at the boundary before anything touches the
//!   network.
//! - Mirrors send progress so the composer can refuse double submission.

use klatsch_core::{CurrentUser, RoomCode, SendOutcome, SessionState};

use crate::{AppAction, AppEvent, RoomView, Screen, UserIntent};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies, fully testable without a runtime.
#[derive(Debug, Clone)]
pub struct App {
    /// Current screen.
    screen: Screen,
    /// Signed-in user, once resolved.
    user: Option<CurrentUser>,
    /// Room view while on [`Screen::Room`].
    room: Option<RoomView>,
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Create a new App on the lobby screen, identity not yet resolved.
    pub fn new() -> Self {
        Self { screen: Screen::Lobby, user: None, room: None, status_message: None }
    }

    /// Process a user interaction and return actions.
    pub fn intent(&mut self, intent: UserIntent) -> Vec<AppAction> {
        match intent {
            UserIntent::CreateRoom => {
                self.status_message = Some("Creating room...".to_string());
                vec![AppAction::CreateRoom, AppAction::Render]
            },
            UserIntent::JoinRoom { input } => match RoomCode::parse(&input) {
                Ok(code) => vec![AppAction::JoinRoom { code }, AppAction::Render],
                Err(e) => {
                    self.status_message = Some(e.to_string());
                    vec![AppAction::Render]
                },
            },
            UserIntent::Submit { content } => self.submit(content),
            UserIntent::CopyInvite => match &self.room {
                Some(view) => {
                    self.status_message = Some("Invite code copied".to_string());
                    vec![
                        AppAction::CopyToClipboard { text: view.code.as_str().to_string() },
                        AppAction::Render,
                    ]
                },
                None => vec![],
            },
            UserIntent::LeaveRoom => {
                self.screen = Screen::Lobby;
                self.room = None;
                vec![AppAction::LeaveRoom, AppAction::Render]
            },
            UserIntent::Quit => vec![AppAction::Quit],
        }
    }

    fn submit(&mut self, content: String) -> Vec<AppAction> {
        let Some(view) = self.room.as_mut() else {
            return vec![];
        };

        // Same guard order as the engine: a blank submission is reported
        // as such even while a send is in flight.
        if content.trim().is_empty() {
            self.status_message = Some("Message must not be empty".to_string());
            return vec![AppAction::Render];
        }
        // Mirror of the engine's Busy guard so the composer refuses the
        // double submission before it reaches the engine.
        if view.sending {
            self.status_message = Some("Still sending the previous message".to_string());
            return vec![AppAction::Render];
        }

        view.sending = true;
        vec![AppAction::SubmitMessage { content }, AppAction::Render]
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::SignedIn { user } => {
                self.user = Some(user);
                vec![AppAction::Render]
            },
            AppEvent::AuthRequired => {
                self.room = None;
                self.screen = Screen::Lobby;
                vec![AppAction::RedirectToSignIn]
            },
            AppEvent::RoomEntered { code } => {
                self.screen = Screen::Room;
                self.room = Some(RoomView::new(code));
                self.status_message = None;
                vec![AppAction::Render]
            },
            AppEvent::TopicChanged { topic } => {
                if let Some(view) = self.room.as_mut() {
                    view.topic = Some(topic);
                }
                vec![AppAction::Render]
            },
            AppEvent::ConversationChanged { messages } => {
                if let Some(view) = self.room.as_mut() {
                    view.messages = messages;
                }
                vec![AppAction::Render]
            },
            AppEvent::ChannelChanged { state } => {
                if let Some(view) = self.room.as_mut() {
                    view.channel = state;
                }
                vec![AppAction::Render]
            },
            AppEvent::SendResolved { outcome } => self.handle_send_resolved(outcome),
            AppEvent::SendRefused { message } => {
                if let Some(view) = self.room.as_mut() {
                    view.sending = false;
                }
                self.status_message = Some(message);
                vec![AppAction::Render]
            },
            AppEvent::LoadingFinished => {
                if let Some(view) = self.room.as_mut() {
                    view.loading = false;
                }
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                self.status_message = Some(format!("Error: {message}"));
                vec![AppAction::Render]
            },
        }
    }

    fn handle_send_resolved(&mut self, outcome: SendOutcome) -> Vec<AppAction> {
        let Some(view) = self.room.as_mut() else {
            return vec![];
        };
        view.sending = false;

        match outcome {
            SendOutcome::Delivered => {
                view.failed_send = None;
            },
            SendOutcome::Rejected { content, reason } => {
                view.failed_send = Some(content);
                self.status_message = Some(format!("Message rejected: {reason}"));
            },
            SendOutcome::TimedOut { content } => {
                view.failed_send = Some(content);
                self.status_message = Some("No confirmation from the server".to_string());
            },
            SendOutcome::Cancelled { .. } => {},
        }
        vec![AppAction::Render]
    }

    /// Current screen.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Signed-in user, once resolved.
    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    /// Room view while inside a room.
    pub fn room(&self) -> Option<&RoomView> {
        self.room.as_ref()
    }

    /// Channel state for the connection indicator, when inside a room.
    pub fn channel_state(&self) -> Option<SessionState> {
        self.room.as_ref().map(|v| v.channel)
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
