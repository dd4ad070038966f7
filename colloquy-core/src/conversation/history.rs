//! Session history store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::{Message, MessageRole};

/// A message as recorded in a [`HistoryStore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedMessage {
    /// Position assigned by the store; strictly increasing within a session
    pub sequence: u64,
    /// Role and content
    pub message: Message,
    /// When the store accepted the message
    pub recorded_at: DateTime<Utc>,
}

impl SequencedMessage {
    pub fn role(&self) -> MessageRole {
        self.message.role
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }
}

/// Ordered message log for one session.
///
/// Sequence numbers are handed out by the store and never reused, including
/// across [`clear`](Self::clear) and [`replace_with`](Self::replace_with).
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStore {
    session_id: String,
    messages: Vec<SequencedMessage>,
    next_sequence: u64,
}

impl HistoryStore {
    /// Create an empty store for `session_id`
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Session this store belongs to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append a message at the end, returning the sequence number it received
    pub fn append(&mut self, message: Message) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.messages.push(SequencedMessage {
            sequence,
            message,
            recorded_at: Utc::now(),
        });
        sequence
    }

    /// All messages in insertion order
    pub fn messages(&self) -> &[SequencedMessage] {
        &self.messages
    }

    /// Role and content of every message, for prompt construction
    pub fn to_messages(&self) -> Vec<Message> {
        self.messages.iter().map(|m| m.message.clone()).collect()
    }

    /// Remove every message. The sequence counter keeps counting.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Clear, then append `messages` in order as the new content
    pub fn replace_with(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.clear();
        for message in messages {
            self.append(message);
        }
    }

    /// Sequence number the next appended message will get
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recently appended message
    pub fn last(&self) -> Option<&SequencedMessage> {
        self.messages.last()
    }

    /// Estimate token count (rough approximation: 4 chars per token)
    pub fn estimate_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.message.content.len() / 4).sum()
    }
}
