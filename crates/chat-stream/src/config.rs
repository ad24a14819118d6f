use std::time::Duration;

use crate::errors::ChatError;

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Configuration for the HTTP chat client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatClientConfig {
    /// Base URL of the chat backend.
    pub base_url: String,
    /// Path of the SSE reply endpoint.
    pub stream_path: String,
    /// Path of the one-shot reply endpoint.
    pub chat_path: String,
    /// Path of the health endpoint.
    pub health_path: String,
    /// Whether sends go to `stream_path` (true) or `chat_path` (false).
    pub streaming: bool,
    /// Optional HTTP timeout. The client core never times out on its own.
    pub timeout: Option<Duration>,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ChatClientConfig {
    /// Creates a config for `base_url` with the default endpoint paths.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            stream_path: "/api/chat/stream".to_string(),
            chat_path: "/api/chat".to_string(),
            health_path: "/api/health".to_string(),
            streaming: true,
            timeout: None,
        }
    }

    /// Builds a config from the process environment.
    ///
    /// Reads `CHAT_API_BASE_URL`, `CHAT_STREAM_PATH`, `CHAT_PATH`,
    /// `CHAT_HEALTH_PATH`, `CHAT_STREAMING` and `CHAT_TIMEOUT_SECS`; unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ChatError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut config = Self::default();
        if let Some(base_url) = get("CHAT_API_BASE_URL") {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(path) = get("CHAT_STREAM_PATH") {
            config.stream_path = path.trim().to_string();
        }
        if let Some(path) = get("CHAT_PATH") {
            config.chat_path = path.trim().to_string();
        }
        if let Some(path) = get("CHAT_HEALTH_PATH") {
            config.health_path = path.trim().to_string();
        }
        if let Some(raw) = get("CHAT_STREAMING") {
            config.streaming = parse_bool(&raw).ok_or_else(|| {
                ChatError::Config(format!("CHAT_STREAMING must be a boolean, got {raw:?}"))
            })?;
        }
        if let Some(raw) = get("CHAT_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ChatError::Config(format!(
                    "CHAT_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Overrides the backend base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the SSE endpoint path.
    pub fn stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    /// Overrides the one-shot endpoint path.
    pub fn chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    /// Overrides the health endpoint path.
    pub fn health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    /// Selects the SSE endpoint (true) or the one-shot endpoint (false).
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Sets the HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ChatError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ChatError::Config("base_url must not be empty".into()));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ChatError::Config(format!(
                "base_url must start with http:// or https://, got {base:?}"
            )));
        }
        Ok(())
    }

    /// URL a chat message is posted to.
    pub fn send_url(&self) -> String {
        let path = if self.streaming {
            &self.stream_path
        } else {
            &self.chat_path
        };
        join_url(&self.base_url, path)
    }

    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        path.trim().trim_start_matches('/')
    )
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}
