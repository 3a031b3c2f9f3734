//! Tests for the Gemini client against a local stand-in server.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use whatsapp_chef::config::GenerationConfig;
use whatsapp_chef::models::RestaurantConfig;
use whatsapp_chef::services::{ApiKey, CopyGenerator, GeminiGenerator, GenerationError};

/// What the fake server saw on its last request.
#[derive(Default, Clone)]
struct Captured {
    inner: Arc<Mutex<Option<(String, Option<String>, Value)>>>,
}

#[derive(Clone)]
struct FakeState {
    status: StatusCode,
    reply: Value,
    captured: Captured,
}

async fn generate_content(
    State(state): State<FakeState>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *state.captured.inner.lock().unwrap() = Some((model_action, key, body));
    (state.status, Json(state.reply))
}

/// Starts a fake Gemini endpoint and returns its base URL.
async fn start_fake_server(status: StatusCode, reply: Value) -> (String, Captured) {
    let captured = Captured::default();
    let state = FakeState {
        status,
        reply,
        captured: captured.clone(),
    };
    let app = Router::new()
        .route("/v1beta/models/{model_action}", post(generate_content))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1beta/models"), captured)
}

fn generator_for(endpoint: &str) -> GeminiGenerator {
    let config = GenerationConfig {
        endpoint: endpoint.to_string(),
        timeout_secs: 5,
        ..GenerationConfig::default()
    };
    GeminiGenerator::new(&config).unwrap()
}

fn candidate(text: &str) -> Value {
    json!({ "candidates": [ { "content": { "role": "model", "parts": [ { "text": text } ] } } ] })
}

#[tokio::test]
async fn test_successful_generation() {
    let messages = json!({
        "welcomeMessage": "Hi! *Menu*",
        "billTemplate": "Total: [TOTAL]",
        "kitchenMessage": "On it!"
    });
    let (endpoint, captured) =
        start_fake_server(StatusCode::OK, candidate(&messages.to_string())).await;
    let generator = generator_for(&endpoint);
    let key = ApiKey::new("secret-key").unwrap();

    let result = generator
        .generate_copy(&key, &RestaurantConfig::default())
        .await
        .unwrap();

    assert_eq!(result.welcome_message, "Hi! *Menu*");
    assert_eq!(result.bill_template, "Total: [TOTAL]");
    assert_eq!(result.kitchen_message, "On it!");

    let (model_action, sent_key, body) = captured.inner.lock().unwrap().clone().unwrap();
    assert_eq!(model_action, "gemini-2.5-flash:generateContent");
    assert_eq!(sent_key.as_deref(), Some("secret-key"));
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("Burger & Bites"));
    assert!(prompt.contains("9876543210@upi"));
    assert!(prompt.contains("Truffle Fries ($8)"));
    assert_eq!(
        body["generationConfig"]["responseMimeType"],
        "application/json"
    );
}

#[tokio::test]
async fn test_api_error_status() {
    let reply = json!({ "error": { "code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED" } });
    let (endpoint, _) = start_fake_server(StatusCode::FORBIDDEN, reply).await;
    let generator = generator_for(&endpoint);

    let err = generator
        .generate_copy(&ApiKey::new("bad").unwrap(), &RestaurantConfig::default())
        .await
        .unwrap_err();

    match &err {
        GenerationError::Api { status, message } => {
            assert_eq!(*status, 403);
            assert_eq!(message, "API key not valid.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("API key not valid."));
}

#[tokio::test]
async fn test_malformed_content() {
    let (endpoint, _) = start_fake_server(StatusCode::OK, candidate("not json at all")).await;
    let generator = generator_for(&endpoint);

    let err = generator
        .generate_copy(&ApiKey::new("k").unwrap(), &RestaurantConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let generator = generator_for(&format!("http://{addr}/v1beta/models"));
    let err = generator
        .generate_copy(&ApiKey::new("k").unwrap(), &RestaurantConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Http(_)));
}
