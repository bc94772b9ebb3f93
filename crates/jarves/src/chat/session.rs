//! Request lifecycle for one chat session.
//!
//! A session owns the transcript and at most one in-flight request:
//!
//! ```text
//! Idle --submit--> Pending --reply--> Fulfilled --> Idle
//!                          --error--> Failed    --> Idle
//!                          --stop / newer submit--> Aborted --> Idle
//! ```
//!
//! Every request gets a generation number and a cancellation token. A
//! settling request only touches the transcript while its generation is
//! still the installed one, so replies from superseded or stopped requests
//! are dropped no matter when they arrive.

use std::sync::Arc;

use jarves_protocol::{ChatRequest, ChatResponse};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::transcript::{Message, Transcript};
use super::transport::{ChatTransport, TransportError};

pub const WELCOME_MESSAGE: &str = "Hi! I’m Jarves. Ask me anything. 🧠💬";
pub const CLEARED_MESSAGE: &str = "Chat cleared. How can I help now?";
pub const EMPTY_REPLY_PLACEHOLDER: &str = "(No response)";
pub const ERROR_PREFIX: &str = "⚠️ Request failed: ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Pending,
}

/// How a request settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply was appended as an assistant message.
    Fulfilled(Message),
    /// A failure notice was appended as an error message.
    Failed(Message),
    /// Superseded or stopped. The transcript was not touched.
    Aborted,
}

#[derive(Debug)]
struct ActiveRequest {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Debug)]
struct SessionInner {
    transcript: Transcript,
    model: String,
    active: Option<ActiveRequest>,
    next_generation: u64,
    last_error: Option<String>,
}

/// A chat session. Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    inner: Arc<Mutex<SessionInner>>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>, model: impl Into<String>) -> Self {
        let inner = SessionInner {
            transcript: Transcript::with_greeting(WELCOME_MESSAGE),
            model: model.into(),
            active: None,
            next_generation: 0,
            last_error: None,
        };

        Self {
            transport,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Append `input` as a user message and start a request for it.
    ///
    /// Any request still pending is cancelled first. The returned handle must
    /// be awaited with [`PendingRequest::wait`] for the reply to land.
    pub async fn submit(&self, input: &str) -> Result<PendingRequest, ChatError> {
        let content = input.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let mut inner = self.inner.lock().await;

        if let Some(previous) = inner.active.take() {
            debug!(generation = previous.generation, "Superseding in-flight request");
            previous.cancel.cancel();
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        let cancel = CancellationToken::new();
        inner.active = Some(ActiveRequest {
            generation,
            cancel: cancel.clone(),
        });

        inner.transcript.push(Message::user(content));
        let request = ChatRequest {
            model: Some(inner.model.clone()),
            messages: inner.transcript.to_request_messages(),
        };

        debug!(generation, model = %inner.model, messages = request.messages.len(), "Request pending");

        Ok(PendingRequest {
            session: self.clone(),
            generation,
            cancel,
            request,
        })
    }

    /// Submit `input` and wait for the request to settle.
    pub async fn send(&self, input: &str) -> Result<SendOutcome, ChatError> {
        let pending = self.submit(input).await?;
        Ok(pending.wait().await)
    }

    /// Cancel the pending request, if any. Returns whether one was cancelled.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.active.take() {
            Some(active) => {
                debug!(generation = active.generation, "Request stopped");
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Start over with a fresh greeting. Cancels any pending request.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(active) = inner.active.take() {
            active.cancel.cancel();
        }
        inner.transcript = Transcript::with_greeting(CLEARED_MESSAGE);
        inner.last_error = None;
    }

    pub async fn set_model(&self, model: impl Into<String>) {
        self.inner.lock().await.model = model.into();
    }

    pub async fn model(&self) -> String {
        self.inner.lock().await.model.clone()
    }

    pub async fn state(&self) -> RequestState {
        if self.inner.lock().await.active.is_some() {
            RequestState::Pending
        } else {
            RequestState::Idle
        }
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.lock().await.transcript.messages().to_vec()
    }

    /// Message of the most recent failure, cleared by the next success.
    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.last_error.clone()
    }

    async fn settle(
        &self,
        generation: u64,
        result: Option<Result<ChatResponse, TransportError>>,
    ) -> SendOutcome {
        let mut inner = self.inner.lock().await;

        let is_current = inner
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation);
        if !is_current {
            debug!(generation, "Discarding reply of superseded request");
            return SendOutcome::Aborted;
        }
        inner.active = None;

        match result {
            None => SendOutcome::Aborted,
            Some(Ok(response)) => {
                let text = if response.text.is_empty() {
                    EMPTY_REPLY_PLACEHOLDER.to_string()
                } else {
                    response.text
                };
                let message = Message::assistant(text);
                inner.transcript.push(message.clone());
                inner.last_error = None;
                debug!(generation, "Request fulfilled");
                SendOutcome::Fulfilled(message)
            }
            Some(Err(err)) => {
                let detail = err.to_string();
                warn!(generation, error = %detail, "Chat request failed");
                let message = Message::error(format!("{ERROR_PREFIX}{detail}"));
                inner.transcript.push(message.clone());
                inner.last_error = Some(detail);
                SendOutcome::Failed(message)
            }
        }
    }
}

/// A submitted request that has not settled yet.
///
/// Dropping it without calling [`wait`](Self::wait) leaves the session
/// pending until [`ChatSession::stop`] or the next submit.
pub struct PendingRequest {
    session: ChatSession,
    generation: u64,
    cancel: CancellationToken,
    request: ChatRequest,
}

impl PendingRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Send the request and reconcile the result into the transcript.
    pub async fn wait(self) -> SendOutcome {
        let PendingRequest {
            session,
            generation,
            cancel,
            request,
        } = self;

        let transport = Arc::clone(&session.transport);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            response = transport.send_chat(request) => Some(response),
        };

        session.settle(generation, result).await
    }
}
