//! Client-to-proxy transport.

use async_trait::async_trait;
use jarves_protocol::{ChatRequest, ChatResponse, ErrorResponse, ModelsResponse};
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Errors raised while talking to the proxy.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network failure before a response arrived.
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// The proxy answered with a non-2xx status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// The response body could not be decoded.
    #[error("Invalid response from server: {0}")]
    Decode(String),
}

/// Sends a transcript to the proxy and returns the reply.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatResponse, TransportError>;
}

/// HTTP transport for the proxy's `/api/*` endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /api/health
    pub async fn health(&self) -> Result<bool, TransportError> {
        let response = self.client.get(self.url("/api/health")).send().await?;
        Ok(response.status().is_success())
    }

    /// GET /api/models
    pub async fn list_models(&self) -> Result<ModelsResponse, TransportError> {
        let response = self.client.get(self.url("/api/models")).send().await?;
        handle_response(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatResponse, TransportError> {
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&request)
            .send()
            .await?;

        handle_response(response).await
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TransportError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status,
        message: error_message(status, &body),
    })
}

/// Pick the most useful message out of an error body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body)
        && !parsed.error.is_empty()
    {
        return parsed.error;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed.to_string()
    }
}
