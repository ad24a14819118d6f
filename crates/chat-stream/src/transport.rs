use tracing::debug;

use crate::classify::RawResponse;
use crate::config::ChatClientConfig;
use crate::errors::ChatError;

/// Body of a chat send.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ChatRequest {
    pub message: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sends chat requests and hands back the response with its body unread.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<RawResponse, ChatError>;
}

/// `ChatTransport` over HTTP using reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ChatClientConfig,
}

impl ReqwestTransport {
    /// Creates a transport from explicit client configuration.
    pub fn new(config: ChatClientConfig) -> Result<Self, ChatError> {
        config.validate()?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a transport configured from the environment.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::new(ChatClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ChatClientConfig {
        &self.config
    }

    /// Queries the backend health endpoint and returns the reported status.
    pub async fn health(&self) -> Result<String, ChatError> {
        let url = self.config.health_url();
        debug!(url = %url, "checking backend health");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatError::transport(format!("health request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::transport(format!("health body read failed: {e}")))?;
        if !status.is_success() {
            return Err(ChatError::http(status.as_u16(), body.trim()));
        }
        let reported = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("status")
                    .and_then(|v| v.as_str())
                    .map(ToOwned::to_owned)
            })
            .unwrap_or_else(|| body.trim().to_string());
        debug!(status = %reported, "backend health reported");
        Ok(reported)
    }
}

#[async_trait::async_trait]
impl ChatTransport for ReqwestTransport {
    async fn send(&self, request: &ChatRequest) -> Result<RawResponse, ChatError> {
        let url = self.config.send_url();
        debug!(
            url = %url,
            streaming = self.config.streaming,
            message_len = request.message.len() as u64,
            "posting chat message"
        );
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::transport(format!("chat request failed: {e}")))?;
        Ok(RawResponse::from(response))
    }
}
