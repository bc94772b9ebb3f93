//! HTTP handlers for the chat proxy.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::Uri,
};
use jarves_protocol::{ChatRequest, ChatResponse, HealthResponse, ModelsResponse};
use tracing::info;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::gemini::ChatTurnRequest;
use crate::history::{self, AdaptedConversation};

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// GET /api/models
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default_model: state.chat.default_model.clone(),
        models: state.chat.models.clone(),
    })
}

/// POST /api/chat
///
/// Translates the transcript into provider history, sends the last message
/// as the prompt and returns the generated text. One attempt, no retries.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let AdaptedConversation { prompt, history } = history::adapt(&request.messages)?;
    let model = resolve_model(request.model.as_deref(), &state.chat.default_model);

    info!(model = %model, history_turns = history.len(), "Using model");

    let text = state
        .provider
        .send_message(ChatTurnRequest {
            model,
            system_instruction: Some(state.chat.system_instruction.clone()),
            history,
            prompt,
        })
        .await?;

    Ok(Json(ChatResponse { text }))
}

/// Fallback for unknown `/api/*` paths.
pub async fn api_not_found(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path().to_string())
}

fn resolve_model(requested: Option<&str>, default_model: &str) -> String {
    requested
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .unwrap_or(default_model)
        .to_string()
}
