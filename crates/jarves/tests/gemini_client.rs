//! Gemini client against a stub `generateContent` endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use jarves::gemini::{ChatProvider, ChatTurnRequest, GeminiClient, ProviderError, ProviderTurn};
use serde_json::{Value, json};

const API_KEY: &str = "test-key";

#[derive(Debug, Clone)]
struct Captured {
    target: String,
    api_key: Option<String>,
    body: Value,
}

type Captures = Arc<Mutex<Vec<Captured>>>;

async fn generate(
    State(captures): State<Captures>,
    Path(target): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    captures.lock().unwrap().push(Captured {
        target: target.clone(),
        api_key: api_key.clone(),
        body,
    });

    if api_key.as_deref() != Some(API_KEY) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" } })),
        )
            .into_response();
    }

    let model = target.trim_end_matches(":generateContent");
    match model {
        "quota-model" => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": { "code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED" } })),
        )
            .into_response(),
        "blocked-model" => Json(json!({ "promptFeedback": { "blockReason": "SAFETY" } })).into_response(),
        "empty-error-model" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => Json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello " }, { "text": "there" }] },
                "finishReason": "STOP"
            }]
        }))
        .into_response(),
    }
}

async fn spawn_stub() -> (String, Captures) {
    let captures: Captures = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1beta/models/{target}", post(generate))
        .with_state(captures.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1beta"), captures)
}

fn client(base_url: &str, api_key: &str) -> GeminiClient {
    GeminiClient::new(base_url, api_key, Duration::from_secs(5)).unwrap()
}

fn turn(model: &str) -> ChatTurnRequest {
    ChatTurnRequest {
        model: model.to_string(),
        system_instruction: Some("You are Jarves.".to_string()),
        history: vec![ProviderTurn::user("hi"), ProviderTurn::model("hello")],
        prompt: "how are you?".to_string(),
    }
}

#[tokio::test]
async fn test_send_message_posts_history_and_prompt() {
    let (base_url, captures) = spawn_stub().await;
    let client = client(&base_url, API_KEY);

    let text = client.send_message(turn("gemini-2.5-flash")).await.unwrap();
    assert_eq!(text, "Hello there");

    let captured = captures.lock().unwrap()[0].clone();
    assert_eq!(captured.target, "gemini-2.5-flash:generateContent");
    assert_eq!(captured.api_key.as_deref(), Some(API_KEY));
    assert_eq!(
        captured.body,
        json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "hi" }] },
                { "role": "model", "parts": [{ "text": "hello" }] },
                { "role": "user", "parts": [{ "text": "how are you?" }] }
            ],
            "systemInstruction": { "parts": [{ "text": "You are Jarves." }] }
        })
    );
}

#[tokio::test]
async fn test_chat_keeps_history_across_turns() {
    let (base_url, captures) = spawn_stub().await;
    let client = client(&base_url, API_KEY);

    let mut chat = client.start_chat("gemini-2.5-flash-lite", None, Vec::new());
    chat.send_message("one").await.unwrap();
    chat.send_message("two").await.unwrap();

    assert_eq!(chat.history().len(), 4);

    let second = captures.lock().unwrap()[1].body.clone();
    assert_eq!(second["contents"].as_array().unwrap().len(), 3);
    assert!(second.get("systemInstruction").is_none());
}

#[tokio::test]
async fn test_api_error_message_is_surfaced() {
    let (base_url, _) = spawn_stub().await;
    let client = client(&base_url, API_KEY);

    let err = client.send_message(turn("quota-model")).await.unwrap_err();
    match &err {
        ProviderError::Api { status, message } => {
            assert_eq!(*status, StatusCode::TOO_MANY_REQUESTS);
            assert!(message.contains("exhausted"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert!(err.to_string().contains("Resource has been exhausted"));
}

#[tokio::test]
async fn test_bad_key_is_rejected() {
    let (base_url, _) = spawn_stub().await;
    let client = client(&base_url, "wrong-key");

    let err = client.send_message(turn("gemini-2.5-flash")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Api { status, .. } if status == StatusCode::FORBIDDEN));
    assert!(err.to_string().contains("API key not valid"));
}

#[tokio::test]
async fn test_blocked_prompt() {
    let (base_url, _) = spawn_stub().await;
    let client = client(&base_url, API_KEY);

    let err = client.send_message(turn("blocked-model")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Blocked(ref reason) if reason == "SAFETY"));
}

#[tokio::test]
async fn test_empty_error_body_uses_status_reason() {
    let (base_url, _) = spawn_stub().await;
    let client = client(&base_url, API_KEY);

    let err = client.send_message(turn("empty-error-model")).await.unwrap_err();
    assert!(err.to_string().contains("Service Unavailable"));
}

#[tokio::test]
async fn test_unreachable_provider() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}/v1beta"), API_KEY);
    let err = client.send_message(turn("gemini-2.5-flash")).await.unwrap_err();
    assert!(matches!(err, ProviderError::ConnectionFailed { .. }));
}
