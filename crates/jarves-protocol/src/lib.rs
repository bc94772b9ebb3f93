//! Wire types for the Jarves chat proxy.
//!
//! These are the JSON shapes exchanged between a chat client and the proxy
//! server:
//!
//! ```text
//! Client --[POST /api/chat: ChatRequest]--> Proxy --[generateContent]--> Gemini
//!        <--[ChatResponse | ErrorResponse]--
//! ```
//!
//! The proxy is stateless. Every request carries the full visible transcript
//! and the server derives the provider history from it.

use serde::{Deserialize, Serialize};

/// Role of a message as it travels over the wire.
///
/// `system` is accepted for compatibility with OpenAI-style clients and
/// `error` for clients that forward their transcript verbatim. Neither ever
/// reaches the provider history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
    Error,
}

impl ChatRole {
    /// Whether messages with this role are part of the conversation proper.
    pub fn is_conversational(&self) -> bool {
        matches!(self, ChatRole::User | ChatRole::Assistant)
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier. The server's default model is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Ordered transcript; the last entry is the prompt.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Successful reply from `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub text: String,
}

/// Reply from `GET /api/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Structured error body returned for every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub code: String,
}

/// One selectable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub label: String,
}

/// Reply from `GET /api/models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub default_model: String,
    pub models: Vec<ModelInfo>,
}
