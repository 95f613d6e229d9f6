//! In-memory rolling conversation history.
//!
//! `ConversationStore` maps a conversation id to its ordered turn list and
//! keeps each list inside a sliding window of `2 * max_rounds` turns.
//! Turns are cloned on read so no `DashMap` guard outlives a call.

use std::sync::Arc;

use dashmap::DashMap;

use parley_types::conversation::{ConversationId, Turn, TurnRole};

/// Rounds kept when no explicit limit is configured.
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Process-lifetime store of conversation turns.
///
/// Cloning produces a shared view of the same underlying data (backed by
/// `Arc`). Separate `new()` calls produce fully isolated stores. Nothing is
/// persisted: the contents die with the process.
///
/// The store offers no cross-call atomicity. Callers that need a
/// read-then-write sequence to be serialized per conversation must hold a
/// per-conversation lock (see `TurnOrchestrator`).
#[derive(Debug, Clone)]
pub struct ConversationStore {
    inner: Arc<DashMap<ConversationId, Vec<Turn>>>,
    max_rounds: usize,
}

impl ConversationStore {
    /// Create an empty store retaining at most `max_rounds` rounds per
    /// conversation. A limit of zero is raised to one round.
    pub fn new(max_rounds: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            max_rounds: max_rounds.max(1),
        }
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Maximum number of turns kept for one conversation.
    pub fn max_turns(&self) -> usize {
        self.max_rounds * 2
    }

    /// Snapshot of a conversation's turns in chronological order.
    ///
    /// Unknown ids yield an empty list.
    pub fn get(&self, id: &ConversationId) -> Vec<Turn> {
        self.inner
            .get(id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Append one turn, creating the conversation on first use.
    ///
    /// When the list grows past `max_turns()`, the oldest turns are dropped
    /// until exactly `max_turns()` remain.
    pub fn append(&self, id: &ConversationId, role: TurnRole, content: impl Into<String>) {
        let max_turns = self.max_turns();
        let mut turns = self.inner.entry(id.clone()).or_default();
        turns.push(Turn::new(role, content));

        if turns.len() > max_turns {
            let excess = turns.len() - max_turns;
            turns.drain(..excess);
        }
    }

    /// Remove a conversation entirely. Unknown ids are a no-op.
    pub fn clear(&self, id: &ConversationId) {
        self.inner.remove(id);
    }

    /// Number of turns currently held for `id`.
    pub fn len(&self, id: &ConversationId) -> usize {
        self.inner.get(id).map(|r| r.value().len()).unwrap_or(0)
    }

    /// Number of conversations with at least one stored turn.
    pub fn conversation_count(&self) -> usize {
        self.inner.len()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROUNDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ConversationId {
        ConversationId::new(s)
    }

    fn contents(turns: &[Turn]) -> Vec<String> {
        turns.iter().map(|t| t.content.clone()).collect()
    }

    #[test]
    fn test_get_unknown_returns_empty() {
        let store = ConversationStore::default();
        assert!(store.get(&id("nobody")).is_empty());
        assert_eq!(store.len(&id("nobody")), 0);
        assert_eq!(store.conversation_count(), 0);
    }

    #[test]
    fn test_append_creates_conversation() {
        let store = ConversationStore::default();
        store.append(&id("a"), TurnRole::User, "hello");

        let turns = store.get(&id("a"));
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(store.conversation_count(), 1);
    }

    #[test]
    fn test_append_keeps_content_verbatim() {
        let store = ConversationStore::default();
        store.append(&id("a"), TurnRole::User, "  spaced\n");
        assert_eq!(store.get(&id("a"))[0].content, "  spaced\n");
    }

    #[test]
    fn test_window_keeps_last_turns_in_order() {
        let max_rounds = 3;
        let cap = max_rounds * 2;

        for n in 0..=(cap * 2 + 1) {
            let store = ConversationStore::new(max_rounds);
            let conv = id("w");
            for i in 0..n {
                let role = if i % 2 == 0 { TurnRole::User } else { TurnRole::Assistant };
                store.append(&conv, role, format!("m{i}"));
            }

            let kept = store.get(&conv);
            let expected_len = n.min(cap);
            assert_eq!(kept.len(), expected_len, "after {n} appends");

            let expected: Vec<String> = (n - expected_len..n).map(|i| format!("m{i}")).collect();
            assert_eq!(contents(&kept), expected, "after {n} appends");
        }
    }

    #[test]
    fn test_window_is_two_turns_per_round() {
        let store = ConversationStore::new(10);
        assert_eq!(store.max_turns(), 20);
        for i in 0..25 {
            store.append(&id("c"), TurnRole::User, format!("{i}"));
        }
        let turns = store.get(&id("c"));
        assert_eq!(turns.len(), 20);
        assert_eq!(turns.first().unwrap().content, "5");
        assert_eq!(turns.last().unwrap().content, "24");
    }

    #[test]
    fn test_zero_rounds_is_raised_to_one() {
        let store = ConversationStore::new(0);
        assert_eq!(store.max_rounds(), 1);
        for i in 0..5 {
            store.append(&id("z"), TurnRole::User, format!("{i}"));
        }
        assert_eq!(contents(&store.get(&id("z"))), vec!["3", "4"]);
    }

    #[test]
    fn test_clear_removes_conversation() {
        let store = ConversationStore::default();
        store.append(&id("a"), TurnRole::User, "x");
        store.append(&id("a"), TurnRole::Assistant, "y");

        store.clear(&id("a"));

        assert!(store.get(&id("a")).is_empty());
        assert_eq!(store.conversation_count(), 0);
    }

    #[test]
    fn test_clear_unknown_leaves_others_untouched() {
        let store = ConversationStore::default();
        store.append(&id("keep"), TurnRole::User, "x");

        store.clear(&id("missing"));

        assert_eq!(contents(&store.get(&id("keep"))), vec!["x"]);
        assert_eq!(store.conversation_count(), 1);
    }

    #[test]
    fn test_clear_then_append_starts_fresh() {
        let store = ConversationStore::default();
        store.append(&id("a"), TurnRole::User, "old");
        store.clear(&id("a"));
        store.append(&id("a"), TurnRole::User, "new");
        assert_eq!(contents(&store.get(&id("a"))), vec!["new"]);
    }

    #[test]
    fn test_clones_share_state_but_new_stores_are_isolated() {
        let store = ConversationStore::default();
        let view = store.clone();
        let other = ConversationStore::default();

        store.append(&id("a"), TurnRole::User, "x");

        assert_eq!(view.len(&id("a")), 1);
        assert_eq!(other.len(&id("a")), 0);
    }

    #[test]
    fn test_snapshot_is_detached_from_later_writes() {
        let store = ConversationStore::default();
        store.append(&id("a"), TurnRole::User, "x");
        let snapshot = store.get(&id("a"));
        store.append(&id("a"), TurnRole::Assistant, "y");
        assert_eq!(snapshot.len(), 1);
    }
}
