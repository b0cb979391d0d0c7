//! Runtime configuration for the server, the API client and local state.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default base URL the client talks to.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

/// Default delay before processed uploads flip to ready.
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(1500);

/// Environment variable names.
pub mod env {
    /// Server bind host.
    pub const HOST: &str = "SOCRATIC_HOST";
    /// Server port.
    pub const PORT: &str = "SOCRATIC_PORT";
    /// Static directory served as fallback.
    pub const STATIC_DIR: &str = "SOCRATIC_STATIC_DIR";
    /// Client base URL.
    pub const API_URL: &str = "SOCRATIC_API_URL";
    /// Client request timeout in seconds.
    pub const TIMEOUT_SECS: &str = "SOCRATIC_TIMEOUT_SECS";
    /// Client storage file.
    pub const STORAGE_PATH: &str = "SOCRATIC_STORAGE_PATH";
    /// Upload processing delay in milliseconds.
    pub const PROCESSING_MS: &str = "SOCRATIC_PROCESSING_MS";
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be used.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// A loaded configuration violates an invariant.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Convenience result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Mock API server settings.
    pub server: ServerConfig,
    /// Request wrapper settings.
    pub client: ClientConfig,
    /// Upload queue settings.
    pub uploads: UploadConfig,
    /// Client-side storage settings.
    pub storage: StorageConfig,
}

/// Mock API server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: IpAddr,
    /// Port to bind.
    pub port: u16,
    /// Directory served for paths no route matches.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            static_dir: None,
        }
    }
}

/// Request wrapper settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL relative paths are joined onto.
    pub base_url: String,
    /// Whole-request timeout; `None` leaves it to the socket.
    #[serde(with = "option_secs")]
    pub request_timeout: Option<Duration>,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: None,
            user_agent: format!("socratic-mentor/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Upload queue settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Delay between a successful upload and the batch turning ready.
    #[serde(with = "duration_ms")]
    pub processing_delay: Duration,
    /// Accepted file extensions, lowercase, without the dot.
    pub accepted_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            processing_delay: DEFAULT_PROCESSING_DELAY,
            accepted_extensions: ["pdf", "ppt", "pptx", "md", "txt"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Client-side storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file backing the key/value store.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".socratic").join("storage.json"),
        }
    }
}

impl AppConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the process environment.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unusable value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup, falling back to defaults.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unusable value.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(env::HOST) {
            config.server.host = parse_var(env::HOST, &raw)?;
        }
        if let Some(raw) = lookup(env::PORT) {
            config.server.port = parse_var(env::PORT, &raw)?;
        }
        if let Some(raw) = lookup(env::STATIC_DIR) {
            config.server.static_dir = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup(env::API_URL) {
            config.client.base_url = raw;
        }
        if let Some(raw) = lookup(env::TIMEOUT_SECS) {
            let secs: u64 = parse_var(env::TIMEOUT_SECS, &raw)?;
            config.client.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(raw) = lookup(env::STORAGE_PATH) {
            config.storage.path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup(env::PROCESSING_MS) {
            let ms: u64 = parse_var(env::PROCESSING_MS, &raw)?;
            config.uploads.processing_delay = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the server port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    /// Set the client base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.client.base_url = url.into();
        self
    }

    /// Set the client request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client.request_timeout = Some(timeout);
        self
    }

    /// Set the upload processing delay.
    #[must_use]
    pub const fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.uploads.processing_delay = delay;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        let url = Url::parse(&self.client.base_url)
            .map_err(|e| ConfigError::Invalid(format!("client.base_url: {e}")))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "client.base_url must be an absolute http(s) URL".to_string(),
            ));
        }

        if self.client.request_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid(
                "client.request_timeout must be > 0".to_string(),
            ));
        }

        if self.uploads.accepted_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "uploads.accepted_extensions must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T>(var: &'static str, raw: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

mod option_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.client.base_url, DEFAULT_API_URL);
        assert!(config.client.request_timeout.is_none());
        assert_eq!(config.uploads.processing_delay, Duration::from_millis(1500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (env::PORT, "8080"),
            (env::API_URL, "http://localhost:8080"),
            (env::TIMEOUT_SECS, "12"),
            (env::PROCESSING_MS, "10"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.client.base_url, "http://localhost:8080");
        assert_eq!(config.client.request_timeout, Some(Duration::from_secs(12)));
        assert_eq!(config.uploads.processing_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[(env::PORT, "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: env::PORT, .. }));
    }

    #[test]
    fn test_validate_rejects_relative_base_url() {
        let config = AppConfig::new().with_base_url("/api");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        assert!(AppConfig::new().with_base_url("ftp://x").validate().is_err());
        assert!(AppConfig::new().with_base_url("https://mentor.example/api/").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = AppConfig::new().with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serializes_durations_as_numbers() {
        let json = serde_json::to_value(AppConfig::new().with_processing_delay(Duration::from_millis(250)))
            .unwrap();
        assert_eq!(json["uploads"]["processing_delay"], 250);
        assert!(json["client"]["request_timeout"].is_null());
    }
}
