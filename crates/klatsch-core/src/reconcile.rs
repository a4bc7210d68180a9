//! Merging the two message sources into one conversation view.
//!
//! History pages and live pushes arrive with no coordination between them:
//! a message can appear in both, in either order, and pages can overlap
//! live traffic that raced the fetch. The reconciler absorbs all of it
//! behind two ingestion paths that are individually idempotent and jointly
//! commutative, so the resulting view depends only on the set of messages
//! observed, never on arrival order.

use std::collections::HashSet;

use crate::room::{Message, chronological};

/// The ordered, duplicate-free conversation for one room.
///
/// # Invariants
///
/// - `messages` is always sorted by timestamp, with message id as the
///   tie-break for simultaneous messages
/// - no message id appears twice
#[derive(Debug, Clone, Default)]
pub struct ConversationView {
    messages: Vec<Message>,
    seen: HashSet<String>,
}

impl ConversationView {
    /// Empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in display order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when no messages have been ingested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// True if a message with this id is already in the view.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Insert one message, keeping order and uniqueness.
    ///
    /// Returns false if the id was already present; the stored copy wins
    /// and the new one is dropped.
    fn insert(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id.clone()) {
            return false;
        }

        // Live traffic is mostly append-at-end; history backfill lands
        // earlier. partition_point finds the slot either way.
        let at = self
            .messages
            .partition_point(|existing| chronological(existing, &message) == std::cmp::Ordering::Less);
        self.messages.insert(at, message);
        true
    }
}

/// Reconciles history pages and live pushes into a [`ConversationView`].
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    view: ConversationView,
}

impl Reconciler {
    /// Reconciler over an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current conversation view.
    #[must_use]
    pub fn view(&self) -> &ConversationView {
        &self.view
    }

    /// Ingest one page of persisted history.
    ///
    /// Page ordering is not trusted; each message is slotted individually.
    /// Returns how many messages were new to the view.
    pub fn ingest_history_page(&mut self, messages: Vec<Message>) -> usize {
        messages.into_iter().filter(|m| self.view.insert(m.clone())).count()
    }

    /// Ingest one live push.
    ///
    /// Returns false when the message was already known (for example from
    /// a history page that raced the push) and the view is unchanged.
    pub fn ingest_live_push(&mut self, message: Message) -> bool {
        self.view.insert(message)
    }

    /// Drop all state, for room teardown.
    pub fn clear(&mut self) {
        self.view = ConversationView::new();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn msg(id: &str, secs: i64) -> Message {
        Message {
            id: id.to_string(),
            author_id: "u1".to_string(),
            author_label: "ada".to_string(),
            content: format!("msg {id}"),
            timestamp: Utc.timestamp_opt(secs, 0).single().unwrap(),
        }
    }

    fn ids(view: &ConversationView) -> Vec<&str> {
        view.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn history_then_overlapping_live_pushes() {
        let mut r = Reconciler::new();

        let inserted = r.ingest_history_page(vec![msg("m1", 10), msg("m2", 20)]);
        assert_eq!(inserted, 2);

        // m2 arrives again over the live channel: duplicate, dropped.
        assert!(!r.ingest_live_push(msg("m2", 20)));

        // m3 is older than m2: slotted between, not appended.
        assert!(r.ingest_live_push(msg("m3", 15)));

        assert_eq!(ids(r.view()), vec!["m1", "m3", "m2"]);
    }

    #[test]
    fn live_push_before_history_yields_same_view() {
        let mut r = Reconciler::new();

        assert!(r.ingest_live_push(msg("m2", 20)));
        assert!(r.ingest_live_push(msg("m3", 15)));
        let inserted = r.ingest_history_page(vec![msg("m1", 10), msg("m2", 20)]);
        assert_eq!(inserted, 1);

        assert_eq!(ids(r.view()), vec!["m1", "m3", "m2"]);
    }

    #[test]
    fn repeated_page_ingestion_is_idempotent() {
        let mut r = Reconciler::new();
        let page = vec![msg("a", 1), msg("b", 2), msg("c", 3)];

        assert_eq!(r.ingest_history_page(page.clone()), 3);
        assert_eq!(r.ingest_history_page(page), 0);
        assert_eq!(r.view().len(), 3);
    }

    #[test]
    fn unsorted_page_is_sorted_on_ingestion() {
        let mut r = Reconciler::new();
        r.ingest_history_page(vec![msg("c", 30), msg("a", 10), msg("b", 20)]);

        assert_eq!(ids(r.view()), vec!["a", "b", "c"]);
    }

    #[test]
    fn simultaneous_messages_tie_break_on_id() {
        let mut r = Reconciler::new();
        assert!(r.ingest_live_push(msg("zz", 10)));
        assert!(r.ingest_live_push(msg("aa", 10)));

        assert_eq!(ids(r.view()), vec!["aa", "zz"]);
    }

    #[test]
    fn first_stored_copy_wins_on_duplicate_id() {
        let mut r = Reconciler::new();
        assert!(r.ingest_live_push(msg("m1", 10)));

        let mut altered = msg("m1", 10);
        altered.content = "tampered".to_string();
        assert!(!r.ingest_live_push(altered));

        assert_eq!(r.view().messages()[0].content, "msg m1");
    }

    #[test]
    fn clear_resets_the_view() {
        let mut r = Reconciler::new();
        r.ingest_live_push(msg("m1", 10));
        r.clear();

        assert!(r.view().is_empty());
        assert!(!r.view().contains("m1"));
    }
}
