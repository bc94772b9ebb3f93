//! Gemini `generateContent` request and response types.

use serde::{Deserialize, Serialize};

use super::error::{ProviderError, ProviderResult};

/// Role vocabulary of the Gemini chat history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// A text part of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// One turn of provider history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTurn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

impl ProviderTurn {
    /// Create a turn with a single text part.
    pub fn text(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(TurnRole::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::text(TurnRole::Model, text)
    }
}

/// One chat exchange: seed history plus the new prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurnRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub history: Vec<ProviderTurn>,
    pub prompt: String,
}

/// System instruction block. Gemini only reads the parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

/// Body of `models/{model}:generateContent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<ProviderTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
}

impl GenerateContentRequest {
    /// Build the request for `prompt` on top of `history`.
    pub fn new(history: &[ProviderTurn], prompt: &str, system_instruction: Option<&str>) -> Self {
        let mut contents = history.to_vec();
        contents.push(ProviderTurn::user(prompt));

        let system_instruction = system_instruction
            .filter(|text| !text.trim().is_empty())
            .map(|text| SystemInstruction {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            });

        Self {
            contents,
            system_instruction,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    /// Set on reasoning parts of thinking models.
    #[serde(default)]
    pub thought: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Finish reasons that mean the candidate text must not be shown.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "LANGUAGE"];

impl GenerateContentResponse {
    /// Text of the first candidate, with reasoning parts left out.
    ///
    /// An answer without candidates yields an empty string unless the prompt
    /// itself was blocked.
    pub fn text(&self) -> ProviderResult<String> {
        let Some(candidate) = self.candidates.first() else {
            if let Some(reason) = self
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.block_reason.as_ref())
            {
                return Err(ProviderError::Blocked(reason.clone()));
            }
            return Ok(String::new());
        };

        if let Some(reason) = candidate.finish_reason.as_deref()
            && BLOCKING_FINISH_REASONS.contains(&reason)
        {
            return Err(ProviderError::Blocked(reason.to_string()));
        }

        let text = candidate
            .content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter(|part| part.thought != Some(true))
            .filter_map(|part| part.text.as_deref())
            .collect::<String>();

        Ok(text)
    }
}

/// Error envelope returned by the Gemini API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
