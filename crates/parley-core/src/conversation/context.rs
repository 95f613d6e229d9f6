//! Model context assembly.
//!
//! The context for every call has a fixed shape:
//!
//! 1. the instruction preamble, tagged `MessageRole::System`
//! 2. every stored turn of the conversation, oldest first
//! 3. the new inbound message, tagged `MessageRole::User`
//!
//! Provider adapters decide how the system entry is delivered (native
//! system slot, or a leading non-user turn).

use parley_types::conversation::{ConversationId, Turn};
use parley_types::llm::{Message, MessageRole};

use super::store::ConversationStore;

/// Builds the role/content sequence sent to the model.
///
/// Pure read + compose: it never mutates the store.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    preamble: String,
}

impl ContextBuilder {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
        }
    }

    /// Build the context for `new_message` from the current contents of
    /// `store` for `id`.
    pub fn build(
        &self,
        store: &ConversationStore,
        id: &ConversationId,
        new_message: &str,
    ) -> Vec<Message> {
        self.build_from_turns(&store.get(id), new_message)
    }

    /// Build the context from an explicit history snapshot.
    pub fn build_from_turns(&self, history: &[Turn], new_message: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);

        messages.push(Message::new(MessageRole::System, self.preamble.clone()));
        messages.extend(
            history
                .iter()
                .map(|turn| Message::new(turn.role.into(), turn.content.clone())),
        );
        messages.push(Message::new(MessageRole::User, new_message));

        messages
    }
}
