//! Normalized failure type for every API call.

use std::fmt;

use thiserror::Error;

/// Fallback text shown to the user for any failed request.
pub const GENERIC_FAILURE_MESSAGE: &str = "Sorry, there was an error. Please try again.";

/// Which stage of the round trip failed.
///
/// Kept for logs only; the UI layer sees the same message for all of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The request never produced a response (connect, TLS, body read).
    Network,
    /// The server answered with a non-2xx status.
    Http,
    /// The body was not valid JSON for the expected shape.
    Parse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network failure"),
            Self::Http => write!(f, "http error"),
            Self::Parse => write!(f, "parse failure"),
        }
    }
}

/// The single error returned by [`ApiClient`](super::ApiClient).
#[derive(Debug, Error)]
#[error("request to {path} failed: {kind}: {detail}")]
pub struct RequestFailed {
    /// Failure stage.
    pub kind: FailureKind,
    /// Request path as given by the caller.
    pub path: String,
    /// HTTP status, when a response arrived.
    pub status: Option<u16>,
    /// Response text, when one could be read.
    pub body: Option<String>,
    detail: String,
}

impl RequestFailed {
    /// The request did not complete.
    #[must_use]
    pub fn network(path: &str, err: &reqwest::Error) -> Self {
        Self {
            kind: FailureKind::Network,
            path: path.to_string(),
            status: err.status().map(|s| s.as_u16()),
            body: None,
            detail: err.to_string(),
        }
    }

    /// The server answered with a non-success status.
    #[must_use]
    pub fn http(path: &str, status: u16, body: String) -> Self {
        let body = if body.is_empty() { None } else { Some(body) };
        Self {
            kind: FailureKind::Http,
            path: path.to_string(),
            status: Some(status),
            detail: format!("status {status}"),
            body,
        }
    }

    /// The response body did not decode.
    #[must_use]
    pub fn parse(path: &str, status: u16, body: String, err: &serde_json::Error) -> Self {
        Self {
            kind: FailureKind::Parse,
            path: path.to_string(),
            status: Some(status),
            body: Some(body),
            detail: err.to_string(),
        }
    }

    /// The path could not be joined onto the base URL.
    #[must_use]
    pub fn invalid_path(path: &str, err: &url::ParseError) -> Self {
        Self {
            kind: FailureKind::Network,
            path: path.to_string(),
            status: None,
            body: None,
            detail: format!("invalid path: {err}"),
        }
    }

    /// Text to display instead of the technical detail.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}
