//! Gemini (generative language API) client module.
//!
//! Provides the [`ChatProvider`] seam used by the HTTP API and its Gemini
//! implementation.

mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use client::{GeminiChat, GeminiClient};
pub use error::{ProviderError, ProviderResult};
pub use types::*;

/// Something that can answer one chat turn.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Start a chat seeded with `request.history` and send `request.prompt`.
    async fn send_message(&self, request: ChatTurnRequest) -> ProviderResult<String>;
}
