//! UI-agnostic conversation state.
//!
//! These types carry no presentation concerns, so any frontend (the CLI
//! REPL, a future TUI) can share them.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// A single turn in the conversation. Immutable once created.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The role of a chat message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_id() -> String {
    // Millisecond clock plus a process-wide counter: ordered enough to sort
    // by, unique even when messages land within the same millisecond.
    let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", Utc::now().timestamp_millis(), seq)
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: next_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only message sequence for the current session.
///
/// Never persisted; cleared only by explicit user action. On a failed send
/// the user's message stays in here so their typed input is not lost.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_within_a_burst() {
        let a = ChatMessage::user("one");
        let b = ChatMessage::user("two");
        let c = ChatMessage::assistant("three");
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
    }

    #[test]
    fn conversation_preserves_append_order() {
        let mut conv = Conversation::new();
        conv.push(ChatMessage::user("hello"));
        conv.push(ChatMessage::assistant("hi there"));
        conv.push(ChatMessage::user("how are you"));

        let contents: Vec<&str> = conv.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hello", "hi there", "how are you"]);
    }

    #[test]
    fn clear_empties_the_conversation() {
        let mut conv = Conversation::new();
        conv.push(ChatMessage::user("hello"));
        assert!(!conv.is_empty());
        conv.clear();
        assert!(conv.is_empty());
    }

    #[test]
    fn roles_serialize_to_wire_strings() {
        assert_eq!(ChatRole::User.as_str(), "user");
        assert_eq!(ChatRole::Assistant.as_str(), "assistant");
    }
}
