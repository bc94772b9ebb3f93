//! Gemini HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::ChatProvider;
use super::error::{ProviderError, ProviderResult};
use super::types::{
    ApiErrorBody, ChatTurnRequest, GenerateContentRequest, GenerateContentResponse, ProviderTurn,
};

/// Client for the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    /// HTTP client.
    client: Client,
    /// Base URL including the API version (e.g. "https://generativelanguage.googleapis.com/v1beta").
    base_url: String,
    /// API key sent as `x-goog-api-key`.
    api_key: String,
}

impl GeminiClient {
    /// Create a new client with the given request timeout.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Start a chat on `model` seeded with `history`.
    pub fn start_chat(
        &self,
        model: &str,
        system_instruction: Option<&str>,
        history: Vec<ProviderTurn>,
    ) -> GeminiChat<'_> {
        GeminiChat {
            client: self,
            model: model.to_string(),
            system_instruction: system_instruction.map(str::to_string),
            history,
        }
    }

    /// Call `models/{model}:generateContent` once.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> ProviderResult<GenerateContentResponse> {
        let url = self.generate_url(model);
        debug!(%url, turns = request.contents.len(), "Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::ConnectionFailed {
                        url: url.clone(),
                        message: e.to_string(),
                    }
                } else {
                    ProviderError::RequestFailed(e)
                }
            })?;

        self.handle_response(response).await
    }

    fn generate_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Handle response and parse JSON or error.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> ProviderResult<GenerateContentResponse> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ProviderError::ParseError(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
            _ if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
            _ => body,
        };

        Err(ProviderError::Api { status, message })
    }
}

/// A chat in progress. Successful exchanges are appended to its history.
#[derive(Debug)]
pub struct GeminiChat<'a> {
    client: &'a GeminiClient,
    model: String,
    system_instruction: Option<String>,
    history: Vec<ProviderTurn>,
}

impl GeminiChat<'_> {
    /// Send `prompt` and return the generated text.
    pub async fn send_message(&mut self, prompt: &str) -> ProviderResult<String> {
        let request =
            GenerateContentRequest::new(&self.history, prompt, self.system_instruction.as_deref());
        let response = self.client.generate_content(&self.model, &request).await?;
        let text = response.text()?;

        self.history.push(ProviderTurn::user(prompt));
        self.history.push(ProviderTurn::model(text.clone()));
        Ok(text)
    }

    pub fn history(&self) -> &[ProviderTurn] {
        &self.history
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn send_message(&self, request: ChatTurnRequest) -> ProviderResult<String> {
        let ChatTurnRequest {
            model,
            system_instruction,
            history,
            prompt,
        } = request;

        let mut chat = self.start_chat(&model, system_instruction.as_deref(), history);
        chat.send_message(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_trims_base_url() {
        let client = GeminiClient::new("http://localhost:9999/v1beta/", "key", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.base_url, "http://localhost:9999/v1beta");
    }

    #[test]
    fn test_generate_url_accepts_prefixed_model() {
        let client =
            GeminiClient::new("http://localhost:9999/v1beta", "key", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.generate_url("models/gemini-2.5-flash"),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            client.generate_url("gemma-3-27b"),
            "http://localhost:9999/v1beta/models/gemma-3-27b:generateContent"
        );
    }
}
