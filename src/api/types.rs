//! JSON bodies exchanged between the client and the mock API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `POST /api/chat` request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question.
    pub message: String,
}

/// `POST /api/chat` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Templated tutor reply.
    pub reply: String,
}

/// `GET /api/health` response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `true` when the server answers.
    pub ok: bool,
    /// Server time.
    pub time: DateTime<Utc>,
}

/// A file as announced to the upload endpoint (name and size only).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// File name including extension.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

impl FileDescriptor {
    /// Build a descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// `POST /api/upload` request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Files being announced.
    pub files: Vec<FileDescriptor>,
}

/// `POST /api/upload` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Always `true` when the server answers.
    pub ok: bool,
    /// Number of files the server counted.
    pub received: usize,
}

/// A conversation thread tracked by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Server-issued identifier.
    pub id: String,
    /// Display title; empty until the first message.
    pub title: String,
    /// Last activity.
    pub updated_at: DateTime<Utc>,
}

/// `POST /api/sessions/{id}/messages` request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionMessageRequest {
    /// Message text.
    pub content: String,
    /// Names of files attached to this turn.
    #[serde(default)]
    pub files: Vec<String>,
}

/// `POST /api/sessions/{id}/messages` response.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessageReply {
    /// Id of the assistant message.
    pub id: String,
    /// Id the server assigned to the user's message.
    pub user_message_id: String,
    /// Assistant reply text.
    pub content: String,
    /// When the assistant message was created.
    pub created_at: DateTime<Utc>,
}

/// `GET /api/analytics` response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    /// Sessions created.
    pub sessions: u64,
    /// Questions asked through any chat endpoint.
    pub questions: u64,
    /// Assistant replies given inside sessions.
    pub insights: u64,
}

/// `GET /api/streak` response: consecutive study days.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    /// Run of days ending today (or yesterday, while today is still open).
    pub current: u32,
    /// Longest run on record.
    pub best: u32,
}
