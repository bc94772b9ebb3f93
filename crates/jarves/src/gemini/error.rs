//! Gemini client error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while generating a reply.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Gemini returned an error response.
    #[error("[{status}] {message}")]
    Api { status: StatusCode, message: String },

    /// The prompt or the candidate was blocked.
    #[error("Response was blocked due to {0}")]
    Blocked(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Connection failed.
    #[error("Failed to connect to Gemini at {url}: {message}")]
    ConnectionFailed { url: String, message: String },
}
