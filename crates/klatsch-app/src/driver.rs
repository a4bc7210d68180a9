//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific
//! I/O implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::future::Future;

use klatsch_core::RoomCode;
use klatsch_proto::Frame;

use crate::{App, UserIntent};

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in production and simulation.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Poll for the next user interaction.
    ///
    /// Returns an available intent or `None` if none are ready.
    fn poll_intent(
        &mut self,
    ) -> impl Future<Output = Result<Option<UserIntent>, Self::Error>> + Send;

    /// Establish the event-channel transport for a room.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn open_transport(
        &mut self,
        room: &RoomCode,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Tear the transport down.
    fn close_transport(&mut self, reason: &str) -> impl Future<Output = ()> + Send;

    /// Send a frame to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the send fails.
    fn send_frame(&mut self, frame: Frame) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive a frame from the server.
    ///
    /// Returns a frame, or `None` when nothing is ready.
    fn recv_frame(&mut self) -> impl Future<Output = Option<Frame>> + Send;

    /// Check whether the transport is up.
    fn is_connected(&self) -> bool;

    /// Report a transport loss since the last call, clearing the flag.
    fn take_connection_lost(&mut self) -> bool;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Put text on the platform clipboard (invite sharing).
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard is unavailable.
    fn set_clipboard(&mut self, text: &str) -> Result<(), Self::Error>;

    /// Hand control to the external sign-in flow.
    fn redirect_to_sign_in(&mut self);

    /// Stop the connection and clean up resources.
    fn stop(&mut self);
}
