//! JSON request wrapper with default headers and normalized failures.

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::chat::ChatMessage;
use crate::config::{ClientConfig, ConfigError, ConfigResult};

use super::error::RequestFailed;
use super::types::{
    Analytics, ChatReply, ChatRequest, FileDescriptor, HealthStatus, Session,
    SessionMessageReply, SessionMessageRequest, Streak, UploadReceipt, UploadRequest,
};

/// Client for the mock API.
///
/// Every call goes through [`ApiClient::request`]; there is no retry and no
/// timeout unless one is configured.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> ConfigResult<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::Invalid(format!("client.base_url: {e}")))?;
        // A trailing slash keeps the base path when endpoints are joined.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Self::build_client(config)?;
        Ok(Self { client, base_url })
    }

    fn build_client(config: &ClientConfig) -> ConfigResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            // Same-origin credentials ride along on every call.
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {e}")))
    }

    /// Base URL paths are joined onto.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path below the base URL, keeping any base path prefix.
    ///
    /// # Errors
    /// Returns an error if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path.trim_start_matches('/'))
    }

    /// Issue a request and decode the JSON body.
    ///
    /// # Errors
    /// Returns [`RequestFailed`] on a transport failure, a non-2xx status, or
    /// a body that does not decode into `T`.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, RequestFailed>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self
            .endpoint(path)
            .map_err(|e| logged(RequestFailed::invalid_path(path, &e)))?;
        debug!(%method, %url, "api request");

        let mut builder = self.client.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| logged(RequestFailed::network(path, &e)))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| logged(RequestFailed::network(path, &e)))?;

        if !status.is_success() {
            return Err(logged(RequestFailed::http(path, status.as_u16(), text)));
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => Err(logged(RequestFailed::parse(path, status.as_u16(), text, &e))),
        }
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn get<T>(&self, path: &str) -> Result<T, RequestFailed>
    where
        T: DeserializeOwned,
    {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    /// `POST` a JSON body.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, RequestFailed>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Ask the tutor a question.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn chat(&self, message: &str) -> Result<ChatReply, RequestFailed> {
        let body = ChatRequest {
            message: message.to_string(),
        };
        self.post("/api/chat", &body).await
    }

    /// Check that the server is up.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn health(&self) -> Result<HealthStatus, RequestFailed> {
        self.get("/api/health").await
    }

    /// Announce a batch of files.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn upload(&self, files: &[FileDescriptor]) -> Result<UploadReceipt, RequestFailed> {
        let body = UploadRequest {
            files: files.to_vec(),
        };
        self.post("/api/upload", &body).await
    }

    /// Start a new session.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn create_session(&self) -> Result<Session, RequestFailed> {
        self.post("/api/sessions", &serde_json::json!({})).await
    }

    /// List sessions, most recently updated first.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn list_sessions(&self) -> Result<Vec<Session>, RequestFailed> {
        self.get("/api/sessions").await
    }

    /// Fetch the transcript of a session.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn session_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, RequestFailed> {
        self.get(&session_messages_path(session_id)).await
    }

    /// Post a message into a session.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn send_session_message(
        &self,
        session_id: &str,
        request: &SessionMessageRequest,
    ) -> Result<SessionMessageReply, RequestFailed> {
        self.post(&session_messages_path(session_id), request).await
    }

    /// Fetch the study streak.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn streak(&self) -> Result<Streak, RequestFailed> {
        self.get("/api/streak").await
    }

    /// Fetch usage counters.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn analytics(&self) -> Result<Analytics, RequestFailed> {
        self.get("/api/analytics").await
    }
}

fn session_messages_path(session_id: &str) -> String {
    format!("/api/sessions/{}/messages", urlencoding::encode(session_id))
}

fn logged(err: RequestFailed) -> RequestFailed {
    warn!(
        kind = %err.kind,
        path = %err.path,
        status = ?err.status,
        "api request failed"
    );
    err
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    use super::*;
    use crate::api::FailureKind;
    use crate::server::{AppState, create_router};

    async fn spawn(app: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
        client_for(&format!("http://{addr}"))
    }

    fn client_for(base_url: &str) -> ApiClient {
        let config = ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        };
        ApiClient::new(&config).expect("client")
    }

    async fn spawn_mock_api() -> ApiClient {
        spawn(create_router(Arc::new(AppState::new()), None)).await
    }

    #[tokio::test]
    async fn test_chat_returns_parsed_reply() {
        let api = spawn_mock_api().await;
        let reply = api.chat("What is entropy?").await.unwrap();
        assert_eq!(
            reply.reply,
            "Let's think this through. What key principle from your materials relates to: \"What is entropy?\"?"
        );
    }

    #[tokio::test]
    async fn test_health_and_upload() {
        let api = spawn_mock_api().await;
        assert!(api.health().await.unwrap().ok);

        let receipt = api
            .upload(&[FileDescriptor::new("a.pdf", 10), FileDescriptor::new("b.md", 20)])
            .await
            .unwrap();
        assert_eq!(receipt, UploadReceipt { ok: true, received: 2 });
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let api = spawn_mock_api().await;
        let session = api.create_session().await.unwrap();

        let reply = api
            .send_session_message(
                &session.id,
                &SessionMessageRequest {
                    content: "Why do stars shine?".to_string(),
                    files: vec![],
                },
            )
            .await
            .unwrap();
        assert!(reply.content.contains("Why do stars shine?"));

        let messages = api.session_messages(&session.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id.as_str(), reply.user_message_id);
        assert_eq!(messages[1].id.as_str(), reply.id);

        let sessions = api.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, "Why do stars shine?");

        let analytics = api.analytics().await.unwrap();
        assert_eq!(analytics.sessions, 1);
        assert_eq!(analytics.insights, 1);

        let streak = api.streak().await.unwrap();
        assert_eq!(streak, Streak { current: 1, best: 1 });
    }

    #[tokio::test]
    async fn test_non_success_status_is_normalized() {
        let app = Router::new().route(
            "/api/chat",
            axum::routing::post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
        let api = spawn(app).await;

        let err = api.chat("hi").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Http);
        assert_eq!(err.status, Some(503));
        assert_eq!(err.body.as_deref(), Some("maintenance"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_http_error() {
        let api = spawn_mock_api().await;
        let err = api.session_messages("missing").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Http);
        assert_eq!(err.status, Some(404));
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_failure() {
        let app = Router::new().route("/api/health", get(|| async { "not json" }));
        let api = spawn(app).await;

        let err = api.health().await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Parse);
        assert_eq!(err.status, Some(200));
        assert_eq!(err.body.as_deref(), Some("not json"));
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let api = client_for(&format!("http://{addr}"));
        let err = api.health().await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Network);
        assert!(err.status.is_none());
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = client_for("http://127.0.0.1:9/mentor");
        assert_eq!(api.base_url().as_str(), "http://127.0.0.1:9/mentor/");
        assert_eq!(
            api.endpoint("/api/chat").unwrap().as_str(),
            "http://127.0.0.1:9/mentor/api/chat"
        );
        assert_eq!(
            client_for("http://127.0.0.1:9").endpoint("/api/chat").unwrap().as_str(),
            "http://127.0.0.1:9/api/chat"
        );
    }

    #[tokio::test]
    async fn test_prefixed_base_url_reaches_nested_api() {
        let app = Router::new().nest("/mentor", create_router(Arc::new(AppState::new()), None));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

        let api = client_for(&format!("http://{addr}/mentor/"));
        assert!(api.health().await.unwrap().ok);
        let reply = api.chat("What is entropy?").await.unwrap();
        assert!(reply.reply.contains("\"What is entropy?\""));
    }

    #[test]
    fn test_session_path_is_encoded() {
        assert_eq!(session_messages_path("a b/c"), "/api/sessions/a%20b%2Fc/messages");
    }
}
