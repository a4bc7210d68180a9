//! Shared in-memory room store.
//!
//! One store backs both the simulated directory (request/response reads)
//! and the scripted server (live channel writes), so a message accepted
//! over the channel is visible to later history fetches exactly like in
//! production.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use klatsch_core::{Message, RoomCode, chronological};

/// Record for one room.
#[derive(Debug, Clone)]
pub struct RoomRecord {
    /// Room topic.
    pub topic: String,
    /// Persisted messages in chronological order.
    pub messages: Vec<Message>,
}

#[derive(Debug, Default)]
struct BackendState {
    rooms: HashMap<RoomCode, RoomRecord>,
    next_code: u32,
}

/// Cloneable handle to the shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room with the given topic and return its fresh code.
    ///
    /// Codes are sequential hex, deterministic across runs.
    pub fn create_room(&self, topic: impl Into<String>) -> RoomCode {
        let mut state = self.lock();
        state.next_code += 1;
        let code = RoomCode::parse(&format!("{:06X}", state.next_code))
            .unwrap_or_else(|_| unreachable!("generated codes are 6 hex chars"));
        state
            .rooms
            .insert(code.clone(), RoomRecord { topic: topic.into(), messages: Vec::new() });
        code
    }

    /// True if the code resolves to a room.
    #[must_use]
    pub fn room_exists(&self, code: &RoomCode) -> bool {
        self.lock().rooms.contains_key(code)
    }

    /// Topic of a room, if it exists.
    #[must_use]
    pub fn topic(&self, code: &RoomCode) -> Option<String> {
        self.lock().rooms.get(code).map(|r| r.topic.clone())
    }

    /// Append a message to a room, keeping chronological order.
    ///
    /// Returns false if the room does not exist.
    pub fn append_message(&self, code: &RoomCode, message: Message) -> bool {
        let mut state = self.lock();
        let Some(record) = state.rooms.get_mut(code) else {
            return false;
        };
        let at = record.messages.partition_point(|m| {
            chronological(m, &message) == std::cmp::Ordering::Less
        });
        record.messages.insert(at, message);
        true
    }

    /// All messages of a room in chronological order.
    #[must_use]
    pub fn messages(&self, code: &RoomCode) -> Option<Vec<Message>> {
        self.lock().rooms.get(code).map(|r| r.messages.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
