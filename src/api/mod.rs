//! Client side of the mock API.
//!
//! One request function with default headers, and one error type for every
//! way a call can fail. Typed helpers cover each endpoint the pages use.

pub mod client;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use error::{FailureKind, GENERIC_FAILURE_MESSAGE, RequestFailed};
pub use types::{
    Analytics, ChatReply, ChatRequest, FileDescriptor, HealthStatus, Session,
    SessionMessageReply, SessionMessageRequest, Streak, UploadReceipt, UploadRequest,
};
