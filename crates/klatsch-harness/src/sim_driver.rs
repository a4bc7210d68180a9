//! In-memory driver for exercising the application runtime.
//!
//! [`SimDriver`] implements [`klatsch_app::Driver`] over queues instead of
//! real I/O, with an optional [`ScriptedServer`] loopback so frames the
//! runtime sends come back as the replies a live server would produce.
//! The driver is a cheap cloneable handle; tests keep a clone to script
//! intents and inspect state after the runtime finishes.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard},
};

use klatsch_app::{App, Driver, UserIntent};
use klatsch_core::RoomCode;
use klatsch_proto::Frame;

use crate::server::{ScriptedServer, ServerReply};

#[derive(Default)]
struct SimState {
    intents: VecDeque<UserIntent>,
    inbound: VecDeque<Frame>,
    sent: Vec<Frame>,
    connected: bool,
    lost_flag: bool,
    fail_connects: u32,
    loopback: Option<ScriptedServer>,
    clipboard: Option<String>,
    redirected: bool,
    renders: usize,
    last_snapshot: Option<App>,
    stopped: bool,
}

/// Queue-backed driver handle.
#[derive(Clone, Default)]
pub struct SimDriver {
    state: Arc<Mutex<SimState>>,
}

impl SimDriver {
    /// Driver with no loopback; sent frames just accumulate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver that loops sent frames through a scripted server.
    #[must_use]
    pub fn with_loopback(server: ScriptedServer) -> Self {
        let driver = Self::default();
        driver.lock().loopback = Some(server);
        driver
    }

    /// Queue a user interaction.
    pub fn push_intent(&self, intent: UserIntent) {
        self.lock().intents.push_back(intent);
    }

    /// Queue an inbound frame as if the server pushed it.
    pub fn push_frame(&self, frame: Frame) {
        self.lock().inbound.push_back(frame);
    }

    /// Drop the connection and raise the loss flag.
    pub fn lose_connection(&self) {
        let mut state = self.lock();
        state.connected = false;
        state.lost_flag = true;
    }

    /// Make the next `count` connection attempts fail.
    pub fn fail_connects(&self, count: u32) {
        self.lock().fail_connects = count;
    }

    /// Frames the runtime sent so far.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.lock().sent.clone()
    }

    /// Clipboard contents, if anything was copied.
    #[must_use]
    pub fn clipboard(&self) -> Option<String> {
        self.lock().clipboard.clone()
    }

    /// True if the runtime redirected to sign-in.
    #[must_use]
    pub fn redirected_to_sign_in(&self) -> bool {
        self.lock().redirected
    }

    /// App state at the last render.
    #[must_use]
    pub fn last_snapshot(&self) -> Option<App> {
        self.lock().last_snapshot.clone()
    }

    /// True once the runtime stopped the driver.
    #[must_use]
    pub fn stopped(&self) -> bool {
        self.lock().stopped
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Driver for SimDriver {
    type Error = io::Error;

    async fn poll_intent(&mut self) -> Result<Option<UserIntent>, Self::Error> {
        Ok(self.lock().intents.pop_front())
    }

    async fn open_transport(&mut self, _room: &RoomCode) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "injected"));
        }
        state.connected = true;
        Ok(())
    }

    async fn close_transport(&mut self, _reason: &str) {
        self.lock().connected = false;
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if !state.connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "transport closed"));
        }
        state.sent.push(frame.clone());

        if let Some(server) = state.loopback.as_mut() {
            let replies = server.handle_frame(&frame);
            for reply in replies {
                match reply {
                    ServerReply::ToSender(f) | ServerReply::Broadcast { frame: f, .. } => {
                        state.inbound.push_back(f);
                    },
                }
            }
        }
        Ok(())
    }

    async fn recv_frame(&mut self) -> Option<Frame> {
        self.lock().inbound.pop_front()
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn take_connection_lost(&mut self) -> bool {
        std::mem::take(&mut self.lock().lost_flag)
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        let mut state = self.lock();
        state.renders += 1;
        state.last_snapshot = Some(app.clone());
        Ok(())
    }

    fn set_clipboard(&mut self, text: &str) -> Result<(), Self::Error> {
        self.lock().clipboard = Some(text.to_string());
        Ok(())
    }

    fn redirect_to_sign_in(&mut self) {
        self.lock().redirected = true;
    }

    fn stop(&mut self) {
        self.lock().stopped = true;
    }
}
