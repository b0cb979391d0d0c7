//! Client-side chat state.
//!
//! A [`Conversation`] owns its [`ChatLog`] and applies each send
//! optimistically: the user entry is appended before the request goes out,
//! then the reply (or a synthetic error entry) is appended when it returns.

pub mod conversation;
pub mod message;
pub mod transport;

pub use conversation::{
    Conversation, GREETING, PendingSend, REFLECTION_THRESHOLD, SendOutcome, SendRejected,
};
pub use message::{ChatLog, ChatMessage, MessageId, Role};
pub use transport::{ChatEndpoint, ChatTransport, SessionEndpoint, TransportReply};
