//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: engine bridge to the room client
//! - [`Driver`]: platform-specific I/O
//! - the external room directory and identity provider

use klatsch_core::{
    CurrentUser, EngineError, Environment, HistoryFetcher, IdentityProvider, RoomCode,
    RoomDirectory,
};

use crate::{App, AppAction, AppEvent, Bridge, Driver, TransportOp};

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: platform-specific I/O driver
/// - `E`: environment for time and randomness
/// - `S`: room directory and identity provider services
pub struct Runtime<D, E, S>
where
    D: Driver,
    E: Environment,
    S: RoomDirectory + IdentityProvider + Clone,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
    services: S,
    fetcher: HistoryFetcher<S>,
    auth_token: Option<String>,
    user: Option<CurrentUser>,
}

impl<D, E, S> Runtime<D, E, S>
where
    D: Driver,
    E: Environment,
    S: RoomDirectory + IdentityProvider + Clone + Send + Sync,
{
    /// Create a new runtime.
    pub fn new(driver: D, env: E, services: S, auth_token: Option<String>) -> Self {
        let fetcher = HistoryFetcher::new(services.clone());
        Self {
            driver,
            app: App::new(),
            bridge: Bridge::new(env),
            services,
            fetcher,
            auth_token,
            user: None,
        }
    }

    /// Run the main event loop.
    ///
    /// Resolves the identity first; without one the runtime redirects to
    /// sign-in and returns. Then it cycles: user intents, server frames,
    /// ticks, and pending I/O between App and Bridge.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        if !self.resolve_identity().await? {
            return Ok(());
        }
        self.driver.render(&self.app)?;

        loop {
            let should_quit = self.process_cycle().await?;
            if should_quit {
                break;
            }
        }

        let _ = self.bridge.leave_room();
        self.flush_io().await?;
        self.driver.stop();
        Ok(())
    }

    /// Resolve the signed-in user. Returns false when the loop must not
    /// start because control went to the sign-in flow.
    async fn resolve_identity(&mut self) -> Result<bool, D::Error> {
        match self.services.profile().await {
            Ok(user) => {
                self.user = Some(user.clone());
                let actions = self.app.handle(AppEvent::SignedIn { user });
                Ok(!self.process_actions(actions).await?)
            },
            Err(EngineError::Unauthenticated) => {
                let actions = self.app.handle(AppEvent::AuthRequired);
                let _ = self.process_actions(actions).await?;
                Ok(false)
            },
            Err(e) => {
                let actions = self.app.handle(AppEvent::Error { message: e.to_string() });
                Ok(!self.process_actions(actions).await?)
            },
        }
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        if let Some(intent) = self.driver.poll_intent().await? {
            let actions = self.app.intent(intent);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }

        if self.driver.take_connection_lost() {
            let mut events = self.bridge.transport_lost();
            events.extend(self.flush_io().await?);
            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        } else if self.driver.is_connected()
            && let Some(frame) = self.driver.recv_frame().await
        {
            let mut events = self.bridge.handle_frame(frame);
            events.extend(self.flush_io().await?);
            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        }

        let mut events = self.bridge.handle_tick();
        events.extend(self.flush_io().await?);
        if self.process_bridge_events(events).await? {
            return Ok(true);
        }

        Ok(false)
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),
                    AppAction::RedirectToSignIn => {
                        self.driver.redirect_to_sign_in();
                        return Ok(true);
                    },
                    AppAction::CopyToClipboard { text } => {
                        if let Err(e) = self.driver.set_clipboard(&text) {
                            tracing::warn!("clipboard unavailable: {e}");
                        }
                    },
                    AppAction::CreateRoom => {
                        let mut events = self.create_room().await;
                        events.extend(self.flush_io().await?);
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },
                    AppAction::JoinRoom { code } => {
                        let mut events = self.join_room(code).await;
                        events.extend(self.flush_io().await?);
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },
                    AppAction::LeaveRoom => {
                        let mut events = self.bridge.leave_room();
                        events.extend(self.flush_io().await?);
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },
                    AppAction::SubmitMessage { content } => {
                        let mut events = self.bridge.submit(content);
                        events.extend(self.flush_io().await?);
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },
                }
            }
        }
        Ok(false)
    }

    /// Create a fresh room via the directory, then enter it.
    async fn create_room(&mut self) -> Vec<AppEvent> {
        match self.services.create_room_code().await {
            Ok(code) => self.enter_room(code),
            Err(EngineError::Unauthenticated) => vec![AppEvent::AuthRequired],
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        }
    }

    /// Validate membership via the directory, then enter the room.
    async fn join_room(&mut self, code: RoomCode) -> Vec<AppEvent> {
        match self.services.join_room_code(&code).await {
            Ok(()) => self.enter_room(code),
            Err(EngineError::Unauthenticated) => vec![AppEvent::AuthRequired],
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        }
    }

    fn enter_room(&mut self, code: RoomCode) -> Vec<AppEvent> {
        let Some(user) = self.user.clone() else {
            return vec![AppEvent::AuthRequired];
        };
        self.bridge.enter_room(user, code, self.auth_token.clone())
    }

    /// Process events from Bridge back to App.
    async fn process_bridge_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        for event in events {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Execute all pending I/O the bridge has accumulated: transport
    /// operations, outgoing frames, and history fetches.
    ///
    /// Executing one batch can queue more (connecting emits the join
    /// frame), so this loops until every queue drains. Resulting events
    /// are returned for the caller to feed back into the App.
    async fn flush_io(&mut self) -> Result<Vec<AppEvent>, D::Error> {
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
                        let Some(room) = self.bridge.room().cloned() else { continue };
                        match self.driver.open_transport(&room).await {
                            Ok(()) => events.extend(self.bridge.transport_connected()),
                            Err(e) => {
                                tracing::warn!("transport connect failed: {e}");
                                events.extend(self.bridge.transport_lost());
                            },
                        }
                    },
                    TransportOp::Close { reason } => {
                        self.driver.close_transport(&reason).await;
                    },
                }
            }

            for frame in frames {
                if let Err(e) = self.driver.send_frame(frame).await {
                    tracing::warn!("frame send failed: {e}");
                    events.extend(self.bridge.transport_lost());
                }
            }

            for (room, page) in fetches {
                match self.fetcher.page(&room, page).await {
                    Ok(history) => events.extend(self.bridge.history_loaded(room, history)),
                    Err(error) => events.extend(self.bridge.history_failed(room, error)),
                }
            }
        }

        Ok(events)
    }

    /// Get a reference to the App.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the App.
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }
}
