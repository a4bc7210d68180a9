//! Scripted event-channel server.
//!
//! Frame-level peer for the room client: joins, message creation, and
//! broadcast fan-out, with deterministic ids and timestamps. Tests drive
//! it explicitly by handing it the frames a client produced and delivering
//! its replies back.

use chrono::{DateTime, TimeZone, Utc};
use klatsch_core::{Message, RoomCode};
use klatsch_proto::{
    EventKind, Frame, Payload,
    events::{ErrorEvent, JoinAck, MessageAck, MessageCreated},
};

use crate::backend::MemoryBackend;

/// A reply the server produced for one incoming frame.
#[derive(Debug, Clone)]
pub enum ServerReply {
    /// Frame addressed to the requesting session only.
    ToSender(Frame),
    /// Frame broadcast to every session joined to the room.
    Broadcast {
        /// Room to fan out to.
        room: RoomCode,
        /// The frame.
        frame: Frame,
    },
}

/// Deterministic in-memory server.
pub struct ScriptedServer {
    backend: MemoryBackend,
    next_message: u64,
    base: DateTime<Utc>,
    /// Reject the next message create with this reason.
    reject_next: Option<String>,
    /// Swallow message acks, simulating a server that accepted the write
    /// but whose confirmation was lost.
    drop_acks: bool,
}

impl ScriptedServer {
    /// Server over the shared store.
    #[must_use]
    pub fn new(backend: MemoryBackend) -> Self {
        Self {
            backend,
            next_message: 0,
            base: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_else(Utc::now),
            reject_next: None,
            drop_acks: false,
        }
    }

    /// Reject the next message create with the given reason.
    pub fn reject_next(&mut self, reason: impl Into<String>) {
        self.reject_next = Some(reason.into());
    }

    /// Start or stop swallowing message acks.
    pub fn set_drop_acks(&mut self, drop: bool) {
        self.drop_acks = drop;
    }

    /// Process one client frame and produce replies.
    pub fn handle_frame(&mut self, frame: &Frame) -> Vec<ServerReply> {
        let payload = match Payload::from_frame(frame) {
            Ok(p) => p,
            Err(e) => {
                return vec![ServerReply::ToSender(error_frame(ErrorEvent::invalid_frame(
                    e.to_string(),
                )))];
            },
        };

        match payload {
            Payload::JoinRoom(join) => self.handle_join(&join.room),
            Payload::MessageCreate(create) => self.handle_create(create),
            other => vec![ServerReply::ToSender(error_frame(ErrorEvent::invalid_frame(format!(
                "unexpected client frame: {:?}",
                other.kind()
            ))))],
        }
    }

    fn handle_join(&mut self, room: &str) -> Vec<ServerReply> {
        let Ok(code) = RoomCode::parse(room) else {
            return vec![ServerReply::ToSender(error_frame(ErrorEvent::room_not_found(room)))];
        };
        let Some(topic) = self.backend.topic(&code) else {
            return vec![ServerReply::ToSender(error_frame(ErrorEvent::room_not_found(room)))];
        };

        let ack = Payload::JoinAck(JoinAck { room: code.as_str().to_string(), topic: Some(topic) });
        match ack.into_frame() {
            Ok(frame) => vec![ServerReply::ToSender(frame)],
            Err(_) => vec![],
        }
    }

    fn handle_create(
        &mut self,
        create: klatsch_proto::events::MessageCreate,
    ) -> Vec<ServerReply> {
        let ack = |error: Option<String>| {
            Payload::MessageAck(MessageAck { request_id: create.request_id, error })
                .into_frame()
                .map(ServerReply::ToSender)
                .ok()
        };

        if let Some(reason) = self.reject_next.take() {
            return ack(Some(reason)).into_iter().collect();
        }

        let Ok(code) = RoomCode::parse(&create.room) else {
            return ack(Some("unknown room".to_string())).into_iter().collect();
        };

        self.next_message += 1;
        let message = Message {
            id: format!("m{:04}", self.next_message),
            author_id: create.author_id.clone(),
            author_label: create.author_id,
            content: create.content,
            timestamp: self.base
                + chrono::Duration::seconds(i64::try_from(self.next_message).unwrap_or(i64::MAX)),
        };

        if !self.backend.append_message(&code, message.clone()) {
            return ack(Some("unknown room".to_string())).into_iter().collect();
        }

        let mut replies = Vec::new();
        if !self.drop_acks
            && let Some(reply) = ack(None)
        {
            replies.push(reply);
        }

        let created = Payload::MessageCreated(MessageCreated {
            room: code.as_str().to_string(),
            message: message.into(),
        });
        if let Ok(frame) = created.into_frame() {
            replies.push(ServerReply::Broadcast { room: code, frame });
        }
        replies
    }
}

fn error_frame(event: ErrorEvent) -> Frame {
    Payload::Error(event)
        .into_frame()
        .unwrap_or_else(|_| Frame::new(EventKind::Error, Vec::new()))
}
