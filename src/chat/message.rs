//! Chat message types and the ordered in-memory log.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of ids given to user messages before the server confirms them.
pub const PROVISIONAL_PREFIX: &str = "temp";
/// Prefix of ids given locally to assistant messages.
pub const ASSISTANT_PREFIX: &str = "a";
/// Prefix of ids given to synthetic error messages.
pub const ERROR_PREFIX: &str = "e";
/// Prefix of ids given to system notes.
pub const SYSTEM_PREFIX: &str = "s";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person typing.
    User,
    /// The tutor.
    Assistant,
    /// Client-generated notes (attachments and the like).
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Message identifier.
///
/// Locally generated ids are `<prefix>-<unix millis>-<sequence>`; the
/// sequence is process-wide so two ids minted in the same millisecond differ.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Temporary id for an optimistic user entry.
    #[must_use]
    pub fn provisional() -> Self {
        Self::local(PROVISIONAL_PREFIX)
    }

    /// Locally issued assistant id.
    #[must_use]
    pub fn assistant() -> Self {
        Self::local(ASSISTANT_PREFIX)
    }

    /// Id for a synthetic error entry.
    #[must_use]
    pub fn error() -> Self {
        Self::local(ERROR_PREFIX)
    }

    /// Id for a system note.
    #[must_use]
    pub fn system() -> Self {
        Self::local(SYSTEM_PREFIX)
    }

    /// Wrap an id issued by the server.
    #[must_use]
    pub fn from_server(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    fn local(prefix: &str) -> Self {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{prefix}-{}-{seq}", Utc::now().timestamp_millis()))
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id still awaits server confirmation.
    #[must_use]
    pub fn is_provisional(&self) -> bool {
        self.has_prefix(PROVISIONAL_PREFIX)
    }

    /// Whether this id marks a synthetic error entry.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.has_prefix(ERROR_PREFIX)
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        self.0
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Identifier, provisional until confirmed.
    pub id: MessageId,
    /// Author.
    pub role: Role,
    /// Text.
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a message stamped with the current time.
    #[must_use]
    pub fn new(id: MessageId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Messages in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    /// Empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Log seeded with existing messages, e.g. a fetched transcript.
    #[must_use]
    pub const fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Append at the end.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Swap a provisional id for a confirmed one. Returns whether it was found.
    pub fn replace_id(&mut self, old: &MessageId, new: MessageId) -> bool {
        match self.messages.iter_mut().find(|m| &m.id == old) {
            Some(message) => {
                message.id = new;
                true
            }
            None => false,
        }
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// All messages, oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Messages appended after the first `n`.
    #[must_use]
    pub fn since(&self, n: usize) -> &[ChatMessage] {
        self.messages.get(n..).unwrap_or(&[])
    }

    /// Number of assistant messages, error entries excluded.
    #[must_use]
    pub fn assistant_replies(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant && !m.id.is_error())
            .count()
    }
}
