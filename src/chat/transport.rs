//! Round trips a conversation can be wired to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::api::{ApiClient, RequestFailed, SessionMessageRequest};

/// What the server said back to one user message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportReply {
    /// Assistant text.
    pub content: String,
    /// Server id of the assistant message, when issued.
    pub message_id: Option<String>,
    /// Server id for the user's message, when issued.
    pub user_message_id: Option<String>,
    /// Server timestamp of the assistant message, when issued.
    pub created_at: Option<DateTime<Utc>>,
}

impl TransportReply {
    /// Reply carrying only text.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            message_id: None,
            user_message_id: None,
            created_at: None,
        }
    }
}

/// Sends one user message and returns the reply.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Perform a single attempt.
    ///
    /// # Errors
    /// Returns the normalized request failure.
    async fn exchange(&self, text: &str) -> Result<TransportReply, RequestFailed>;
}

/// `POST /api/chat`: stateless, no server ids.
#[derive(Clone, Debug)]
pub struct ChatEndpoint {
    api: ApiClient,
}

impl ChatEndpoint {
    /// Wrap a client.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ChatTransport for ChatEndpoint {
    async fn exchange(&self, text: &str) -> Result<TransportReply, RequestFailed> {
        let reply = self.api.chat(text).await?;
        Ok(TransportReply::text(reply.reply))
    }
}

/// `POST /api/sessions/{id}/messages`: server issues ids for both sides.
#[derive(Clone, Debug)]
pub struct SessionEndpoint {
    api: ApiClient,
    session_id: String,
    attachments: Vec<String>,
}

impl SessionEndpoint {
    /// Bind a client to a session.
    #[must_use]
    pub fn new(api: ApiClient, session_id: impl Into<String>) -> Self {
        Self {
            api,
            session_id: session_id.into(),
            attachments: Vec::new(),
        }
    }

    /// File names sent along with every message.
    #[must_use]
    pub fn with_attachments(mut self, names: Vec<String>) -> Self {
        self.attachments = names;
        self
    }

    /// Replace the attachment list.
    pub fn set_attachments(&mut self, names: Vec<String>) {
        self.attachments = names;
    }

    /// Session this endpoint posts into.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl ChatTransport for SessionEndpoint {
    async fn exchange(&self, text: &str) -> Result<TransportReply, RequestFailed> {
        let request = SessionMessageRequest {
            content: text.to_string(),
            files: self.attachments.clone(),
        };
        let reply = self.api.send_session_message(&self.session_id, &request).await?;
        Ok(TransportReply {
            content: reply.content,
            message_id: Some(reply.id),
            user_message_id: Some(reply.user_message_id),
            created_at: Some(reply.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::chat::Role;
    use crate::config::ClientConfig;
    use crate::server::{AppState, create_router};

    async fn spawn_api(state: Arc<AppState>) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let app = create_router(state, None);
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

        let config = ClientConfig {
            base_url: format!("http://{addr}"),
            ..ClientConfig::default()
        };
        ApiClient::new(&config).expect("client")
    }

    #[tokio::test]
    async fn test_chat_endpoint_has_no_server_ids() {
        let endpoint = ChatEndpoint::new(spawn_api(Arc::new(AppState::new())).await);
        let reply = endpoint.exchange("What is entropy?").await.unwrap();
        assert!(reply.content.contains("\"What is entropy?\""));
        assert!(reply.message_id.is_none());
        assert!(reply.user_message_id.is_none());
    }

    #[tokio::test]
    async fn test_session_endpoint_sends_attachments() {
        let state = Arc::new(AppState::new());
        let api = spawn_api(Arc::clone(&state)).await;
        let session = api.create_session().await.unwrap();

        let endpoint = SessionEndpoint::new(api, session.id.clone())
            .with_attachments(vec!["syllabus.pdf".to_string()]);
        assert_eq!(endpoint.session_id(), session.id);

        let reply = endpoint.exchange("Where do I start?").await.unwrap();
        let messages = state.session_messages(&session.id).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "Attached 1 file(s): syllabus.pdf");
        assert_eq!(Some(messages[1].id.as_str()), reply.user_message_id.as_deref());
        assert_eq!(Some(messages[2].id.as_str()), reply.message_id.as_deref());
    }
}
