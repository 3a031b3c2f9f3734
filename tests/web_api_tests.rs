//! Integration tests for the WhatsApp Chef web API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

use whatsapp_chef::constants::{BUSY_MESSAGE, MISSING_API_KEY_MESSAGE};
use whatsapp_chef::models::{GeneratedMessages, RestaurantConfig};
use whatsapp_chef::preview::MemoryClipboard;
use whatsapp_chef::services::{ApiKey, CopyGenerator, GenerationError};
use whatsapp_chef::session::Session;
use whatsapp_chef::web::{create_router, AppState};

/// Generator double: succeeds or fails on demand, optionally waiting on a gate.
struct MockGenerator {
    should_succeed: bool,
    error_message: String,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl MockGenerator {
    fn succeeding() -> Self {
        Self {
            should_succeed: true,
            error_message: String::new(),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            should_succeed: false,
            error_message: message.to_string(),
            ..Self::succeeding()
        }
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::succeeding()
        }
    }
}

#[async_trait]
impl CopyGenerator for MockGenerator {
    async fn generate_copy(
        &self,
        _api_key: &ApiKey,
        config: &RestaurantConfig,
    ) -> Result<GeneratedMessages, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.should_succeed {
            Ok(GeneratedMessages::new(
                format!("Welcome to *{}*!\n_Menu below_", config.name),
                "Your bill: [ITEMS]\nTotal: *[TOTAL]*",
                "Payment received <3",
            ))
        } else {
            Err(GenerationError::Api {
                status: 429,
                message: self.error_message.clone(),
            })
        }
    }
}

struct TestApp {
    app: axum::Router,
    clipboard: Arc<MemoryClipboard>,
    generator: Arc<MockGenerator>,
}

fn create_test_app(generator: MockGenerator, with_key: bool) -> TestApp {
    let generator = Arc::new(generator);
    let clipboard = Arc::new(MemoryClipboard::new());
    let api_key = if with_key {
        ApiKey::new("test-key")
    } else {
        None
    };
    let session = Session::new(api_key, generator.clone(), clipboard.clone());

    TestApp {
        app: create_router(AppState::new(session)),
        clipboard,
        generator,
    }
}

/// Sends a request and returns status plus JSON body (Null when empty).
async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    (status, json)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

async fn post(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, "POST", uri, None).await
}

// ============================================================================
// Health & Session Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, json) = get_json(&test.app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_initial_session() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, json) = get_json(&test.app, "/api/session").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["config"]["name"], "Burger & Bites");
    assert_eq!(json["config"]["paymentHandle"], "9876543210@upi");
    assert_eq!(json["config"]["tone"], "fun");
    assert_eq!(json["config"]["menuItems"].as_array().unwrap().len(), 3);
    assert_eq!(json["status"]["state"], "idle");
    assert_eq!(json["view"], "config");
    assert_eq!(json["hasMessages"], false);
    assert_eq!(json["hasApiKey"], true);
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_update_details() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, json) = send(
        &test.app,
        "PUT",
        "/api/session/details",
        Some(json!({ "name": "Dosa Corner", "tone": "friendly" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["config"]["name"], "Dosa Corner");
    assert_eq!(json["config"]["tone"], "friendly");
    assert_eq!(json["config"]["cuisine"], "American Fast Food");
}

#[tokio::test]
async fn test_update_details_rejects_unknown_tone() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, _) = send(
        &test.app,
        "PUT",
        "/api/session/details",
        Some(json!({ "tone": "grumpy" })),
    )
    .await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_list_tones() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, json) = get_json(&test.app, "/api/tones").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["tones"],
        json!([
            { "value": "fun", "label": "Fun" },
            { "value": "professional", "label": "Professional" },
            { "value": "friendly", "label": "Friendly" }
        ])
    );
}

#[tokio::test]
async fn test_set_view() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, json) = send(
        &test.app,
        "PUT",
        "/api/session/view",
        Some(json!({ "view": "preview" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["view"], "preview");
}

// ============================================================================
// Menu Item Tests
// ============================================================================

#[tokio::test]
async fn test_menu_item_lifecycle() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, item) = post(&test.app, "/api/menu-items").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["name"], "");
    assert_eq!(item["price"], "");
    let id = item["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &test.app,
        "PATCH",
        &format!("/api/menu-items/{id}"),
        Some(json!({ "field": "name", "value": "Mango Lassi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Mango Lassi");

    let (_, session) = get_json(&test.app, "/api/session").await;
    assert_eq!(session["config"]["menuItems"].as_array().unwrap().len(), 4);

    let (status, _) = send(&test.app, "DELETE", &format!("/api/menu-items/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, session) = get_json(&test.app, "/api/session").await;
    assert_eq!(session["config"]["menuItems"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_interleaved_menu_edits_all_persist() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (_, session) = get_json(&test.app, "/api/session").await;
    let items = session["config"]["menuItems"].as_array().unwrap();
    let first = items[0]["id"].as_str().unwrap().to_string();
    let second = items[1]["id"].as_str().unwrap().to_string();

    let edits = [
        (&first, "name", "Smash Burger"),
        (&second, "price", "$4.50"),
        (&first, "price", "$9.99"),
        (&second, "name", "Loaded Fries"),
    ];
    for (id, field, value) in edits {
        let (status, _) = send(
            &test.app,
            "PATCH",
            &format!("/api/menu-items/{id}"),
            Some(json!({ "field": field, "value": value })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, session) = get_json(&test.app, "/api/session").await;
    let items = &session["config"]["menuItems"];
    assert_eq!(items[0]["name"], "Smash Burger");
    assert_eq!(items[0]["price"], "$9.99");
    assert_eq!(items[1]["name"], "Loaded Fries");
    assert_eq!(items[1]["price"], "$4.50");
}

#[tokio::test]
async fn test_unknown_menu_item() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, json) = send(
        &test.app,
        "PATCH",
        "/api/menu-items/does-not-exist",
        Some(json!({ "field": "price", "value": "$1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("does-not-exist"));

    let (status, _) = send(&test.app, "DELETE", "/api/menu-items/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Generation Tests
// ============================================================================

#[tokio::test]
async fn test_generate_success() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, json) = post(&test.app, "/api/generate").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["messages"]["welcomeMessage"],
        "Welcome to *Burger & Bites*!\n_Menu below_"
    );
    assert_eq!(json["session"]["status"]["state"], "ready");
    assert_eq!(json["session"]["view"], "preview");
    assert_eq!(json["session"]["hasMessages"], true);
    assert_eq!(test.generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_generate_without_api_key() {
    let test = create_test_app(MockGenerator::succeeding(), false);

    let (status, json) = post(&test.app, "/api/generate").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], MISSING_API_KEY_MESSAGE);
    assert_eq!(test.generator.calls.load(Ordering::SeqCst), 0);

    let (_, session) = get_json(&test.app, "/api/session").await;
    assert_eq!(session["status"]["state"], "idle");
    assert_eq!(session["error"], MISSING_API_KEY_MESSAGE);
}

#[tokio::test]
async fn test_generate_failure() {
    let test = create_test_app(MockGenerator::failing("Quota exceeded"), true);

    let (status, json) = post(&test.app, "/api/generate").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "Generation failed");
    assert!(json["details"].as_str().unwrap().contains("Quota exceeded"));

    let (_, session) = get_json(&test.app, "/api/session").await;
    assert_eq!(session["status"]["state"], "error");
    assert!(session["error"].as_str().unwrap().contains("Quota exceeded"));
    assert_eq!(session["view"], "config");
}

#[tokio::test]
async fn test_generate_while_busy() {
    let gate = Arc::new(Notify::new());
    let test = create_test_app(MockGenerator::gated(gate.clone()), true);

    let first = tokio::spawn({
        let app = test.app.clone();
        async move { post(&app, "/api/generate").await }
    });

    let mut loading = false;
    for _ in 0..200 {
        let (_, session) = get_json(&test.app, "/api/session").await;
        if session["status"]["state"] == "loading" {
            loading = true;
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(loading, "first generation never started");

    let (status, json) = post(&test.app, "/api/generate").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], BUSY_MESSAGE);

    // A busy rejection is only reported in the response, not on the session.
    let (_, session) = get_json(&test.app, "/api/session").await;
    assert_eq!(session["status"]["state"], "loading");
    assert!(session.get("error").is_none());

    gate.notify_one();
    let (status, _) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(test.generator.calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Preview, Copy & Export Tests
// ============================================================================

#[tokio::test]
async fn test_preview_empty_before_generation() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, json) = get_json(&test.app, "/api/preview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bubbles"], json!([]));

    let (status, _) = get_json(&test.app, "/api/export").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&test.app, "/api/preview/welcome/copy").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preview_after_generation() {
    let test = create_test_app(MockGenerator::succeeding(), true);
    post(&test.app, "/api/generate").await;

    let (status, json) = get_json(&test.app, "/api/preview").await;
    assert_eq!(status, StatusCode::OK);

    let bubbles = json["bubbles"].as_array().unwrap();
    assert_eq!(bubbles.len(), 3);
    assert_eq!(bubbles[0]["slot"], "welcome");
    assert_eq!(bubbles[0]["title"], "1. Welcome & Menu (Auto-reply)");
    assert_eq!(
        bubbles[0]["html"],
        "Welcome to <strong>Burger &amp; Bites</strong>!<br /><em>Menu below</em>"
    );
    assert_eq!(bubbles[1]["slot"], "bill");
    assert_eq!(bubbles[2]["slot"], "kitchen");
    assert_eq!(bubbles[2]["html"], "Payment received &lt;3");
    for bubble in bubbles {
        assert_eq!(bubble["sent_by_user"], false);
        assert!(bubble.get("sent_indicator").is_none());
        assert_eq!(bubble["copy_label"], "Copy Text");
        assert_eq!(bubble["time"].as_str().unwrap().len(), 5);
    }
}

#[tokio::test]
async fn test_copy_message() {
    let test = create_test_app(MockGenerator::succeeding(), true);
    post(&test.app, "/api/generate").await;

    let (status, json) = post(&test.app, "/api/preview/bill/copy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "recently_copied");
    assert_eq!(
        test.clipboard.contents().as_deref(),
        Some("Your bill: [ITEMS]\nTotal: *[TOTAL]*")
    );

    let (_, preview) = get_json(&test.app, "/api/preview").await;
    assert_eq!(preview["bubbles"][1]["copy_label"], "Copied");
    assert_eq!(preview["bubbles"][0]["copy_label"], "Copy Text");
}

#[tokio::test]
async fn test_copy_unknown_slot() {
    let test = create_test_app(MockGenerator::succeeding(), true);
    post(&test.app, "/api/generate").await;

    let (status, json) = post(&test.app, "/api/preview/dessert/copy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Unknown message slot");
}

#[tokio::test]
async fn test_export_after_generation() {
    let test = create_test_app(MockGenerator::succeeding(), true);
    post(&test.app, "/api/generate").await;

    let (status, json) = get_json(&test.app, "/api/export").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["kitchenMessage"], "Payment received <3");
    assert_eq!(json.as_object().unwrap().len(), 3);
}

// ============================================================================
// Static UI Tests
// ============================================================================

#[tokio::test]
async fn test_index_served_at_root() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let response = test
        .app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("WhatsApp Chef"));
}

#[tokio::test]
async fn test_ui_script_flushes_edits_and_reports_busy() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let response = test
        .app
        .clone()
        .oneshot(Request::builder().uri("/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let script = String::from_utf8_lossy(&body);
    assert!(script.contains("`${id}:${field}`"));
    assert!(script.contains("await flushSaves();"));
    assert!(script.contains("e.status === 409"));
    assert!(script.contains("/api/tones"));
}

#[tokio::test]
async fn test_unknown_api_path_is_not_found() {
    let test = create_test_app(MockGenerator::succeeding(), true);

    let (status, _) = get_json(&test.app, "/api/does-not-exist").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
