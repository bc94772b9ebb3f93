//! Transcript to provider history translation.
//!
//! Clients send the whole visible transcript with every request. The last
//! entry is the prompt; everything before it becomes Gemini chat history:
//!
//! - `error` and `system` entries are dropped (neither is conversation)
//! - `assistant` becomes `model`, `user` stays `user`
//! - a history that would open with a `model` turn loses that turn, because
//!   Gemini rejects histories that do not start with the user
//!
//! All functions here are pure.

use jarves_protocol::{ChatMessage, ChatRole};
use thiserror::Error;

use crate::gemini::{ProviderTurn, TurnRole};

/// Errors raised when a transcript cannot be turned into a chat exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("messages must not be empty")]
    EmptyTranscript,
}

/// A transcript split into the new prompt and the history preceding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptedConversation {
    pub prompt: String,
    pub history: Vec<ProviderTurn>,
}

/// Split `messages` into prompt and provider history.
pub fn adapt(messages: &[ChatMessage]) -> Result<AdaptedConversation, AdapterError> {
    let (last, earlier) = messages
        .split_last()
        .ok_or(AdapterError::EmptyTranscript)?;

    let mut history = to_provider_turns(earlier);
    strip_leading_model_turn(&mut history);

    Ok(AdaptedConversation {
        prompt: last.content.clone(),
        history,
    })
}

/// Map conversational messages to provider turns, one text part each.
pub fn to_provider_turns(messages: &[ChatMessage]) -> Vec<ProviderTurn> {
    messages
        .iter()
        .filter(|message| message.role.is_conversational())
        .map(|message| ProviderTurn::text(provider_role(message.role), message.content.clone()))
        .collect()
}

/// Drop a single leading `model` turn. Returns whether a turn was removed.
///
/// Callers put at most one synthetic greeting in front of the conversation,
/// so only the first turn is checked.
pub fn strip_leading_model_turn(history: &mut Vec<ProviderTurn>) -> bool {
    if history.first().is_some_and(|turn| turn.role == TurnRole::Model) {
        history.remove(0);
        true
    } else {
        false
    }
}

fn provider_role(role: ChatRole) -> TurnRole {
    match role {
        ChatRole::Assistant => TurnRole::Model,
        _ => TurnRole::User,
    }
}
