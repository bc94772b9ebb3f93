//! Application state shared across handlers.

use std::path::PathBuf;
use std::sync::Arc;

use jarves_protocol::ModelInfo;

use crate::config::{ProviderConfig, ServerConfig, expand_str_path};
use crate::gemini::ChatProvider;

/// Chat settings applied to every request.
#[derive(Clone, Debug)]
pub struct ChatSettings {
    /// Model used when the request does not name one.
    pub default_model: String,
    /// Persona instruction sent alongside the history.
    pub system_instruction: String,
    /// Models advertised on `/api/models`.
    pub models: Vec<ModelInfo>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from(&ProviderConfig::default())
    }
}

impl From<&ProviderConfig> for ChatSettings {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            default_model: config.default_model.clone(),
            system_instruction: config.system_instruction.clone(),
            models: config.model_catalog(),
        }
    }
}

/// Settings for the HTTP surface around the API.
#[derive(Clone, Debug, Default)]
pub struct WebSettings {
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
    /// Built web client to serve for non-API paths.
    pub static_dir: Option<PathBuf>,
}

impl WebSettings {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let static_dir = config
            .static_dir
            .as_deref()
            .map(expand_str_path)
            .transpose()?;

        Ok(Self {
            cors_origins: config.cors_origins.clone(),
            static_dir,
        })
    }
}

/// Shared state. The proxy keeps no per-conversation data.
#[derive(Clone)]
pub struct AppState {
    /// Provider that answers chat turns.
    pub provider: Arc<dyn ChatProvider>,
    /// Chat settings.
    pub chat: Arc<ChatSettings>,
    /// HTTP surface settings.
    pub web: Arc<WebSettings>,
}

impl AppState {
    pub fn new(provider: Arc<dyn ChatProvider>, chat: ChatSettings) -> Self {
        Self {
            provider,
            chat: Arc::new(chat),
            web: Arc::new(WebSettings::default()),
        }
    }

    pub fn with_web(mut self, web: WebSettings) -> Self {
        self.web = Arc::new(web);
        self
    }
}
