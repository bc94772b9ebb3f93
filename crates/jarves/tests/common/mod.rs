//! Test utilities and common setup.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use jarves::api::{self, AppState, ChatSettings};
use jarves::gemini::{ChatProvider, ChatTurnRequest, ProviderError, ProviderResult};
use reqwest::StatusCode;

/// What the mock provider answers with.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail { status: StatusCode, message: String },
}

/// Provider that records every turn and answers from a script.
#[derive(Debug)]
pub struct MockProvider {
    script: Mutex<Script>,
    requests: Mutex<Vec<ChatTurnRequest>>,
}

impl MockProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script::Reply(text.to_string())),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: StatusCode, message: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script::Fail {
                status,
                message: message.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn requests(&self) -> Vec<ChatTurnRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ChatTurnRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("provider was not called")
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn send_message(&self, request: ChatTurnRequest) -> ProviderResult<String> {
        self.requests.lock().unwrap().push(request);
        match self.script.lock().unwrap().clone() {
            Script::Reply(text) => Ok(text),
            Script::Fail { status, message } => Err(ProviderError::Api { status, message }),
        }
    }
}

/// Router backed by `provider` with default chat settings.
pub fn test_app(provider: Arc<MockProvider>) -> Router {
    let state = AppState::new(provider, ChatSettings::default());
    api::create_router(state)
}

/// Serve `provider` on an ephemeral loopback port. Returns the base URL.
pub async fn spawn_server(provider: Arc<MockProvider>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = test_app(provider);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
