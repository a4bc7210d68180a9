//! Application layer for Klatsch
//!
//! Pure state machines and generic runtime for UI and engine
//! orchestration, enabling deterministic testing with the same code that
//! runs in production.
//!
//! # Components
//!
//! - [`App`]: UI state machine (lobby, room view, composer state)
//! - [`Bridge`]: engine bridge (translates App actions to room client
//!   events)
//! - [`Driver`]: trait for platform-specific I/O abstraction
//! - [`Runtime`]: generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod driver;
mod event;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::App;
pub use bridge::{Bridge, TransportOp};
pub use driver::Driver;
pub use event::{AppEvent, UserIntent};
pub use runtime::Runtime;
pub use state::{RoomView, Screen};
