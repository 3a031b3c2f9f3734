//! Web API module for WhatsApp Chef.
//!
//! This module provides a small REST API over one in-memory [`Session`],
//! plus the embedded single-page form and preview UI.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/session` - Form state, generation status and active view
//! - `GET /api/tones` - Tone choices for the form
//! - `PUT /api/session/details` - Edit name, cuisine, payment handle or tone
//! - `PUT /api/session/view` - Switch between form and preview
//! - `POST /api/menu-items` - Append a blank menu item
//! - `PATCH /api/menu-items/{id}` - Set one field of a menu item
//! - `DELETE /api/menu-items/{id}` - Remove a menu item
//! - `POST /api/generate` - Generate the three templates
//! - `GET /api/preview` - Rendered chat bubbles
//! - `POST /api/preview/{slot}/copy` - Copy one message to the clipboard
//! - `GET /api/export` - Generated messages as JSON

pub mod static_files;

use std::net::SocketAddr;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::constants::APP_NAME;
use crate::models::{GeneratedMessages, MenuItem, MenuItemField, MessageSlot, Tone};
use crate::preview::CopyOutcome;
use crate::session::{ActiveView, DetailsUpdate, GenerateError, Session, SessionSnapshot, SlotBubble};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the web API.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The one session served by this process
    session: Session,
}

impl AppState {
    /// Creates a new application state around `session`.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Crate version
    pub version: String,
}

/// One tone choice.
#[derive(Debug, Serialize)]
pub struct ToneInfo {
    /// Wire value
    pub value: Tone,
    /// Button label
    pub label: &'static str,
}

/// Response of `GET /api/tones`.
#[derive(Debug, Serialize)]
pub struct ToneListResponse {
    /// Tones in display order
    pub tones: Vec<ToneInfo>,
}

impl From<&Tone> for ToneInfo {
    fn from(tone: &Tone) -> Self {
        Self {
            value: *tone,
            label: tone.display_name(),
        }
    }
}

/// Body of `PUT /api/session/view`.
#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    /// Pane to bring to the front
    pub view: ActiveView,
}

/// Body of `PATCH /api/menu-items/{id}`.
#[derive(Debug, Deserialize)]
pub struct MenuItemUpdateRequest {
    /// Field to change
    pub field: MenuItemField,
    /// New value
    pub value: String,
}

/// Response of `POST /api/generate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// The new messages
    pub messages: GeneratedMessages,
    /// Session state after generation
    pub session: SessionSnapshot,
}

/// Response of `GET /api/preview`.
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    /// Bubbles in slot order; empty before the first generation
    pub bubbles: Vec<SlotBubble>,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Error message.
    pub error: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

impl From<GenerateError> for (StatusCode, Json<ApiError>) {
    fn from(err: GenerateError) -> Self {
        let status = match err {
            GenerateError::MissingCredential => StatusCode::BAD_REQUEST,
            GenerateError::Busy => StatusCode::CONFLICT,
            GenerateError::Generation(_) => StatusCode::BAD_GATEWAY,
            GenerateError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = match &err {
            GenerateError::Generation(message) => {
                ApiError::with_details("Generation failed", message.clone())
            }
            other => ApiError::new(other.to_string()),
        };
        (status, Json(body))
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /health - Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/session - Current form state.
async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

/// GET /api/tones - Tone choices in display order.
async fn list_tones() -> Json<ToneListResponse> {
    Json(ToneListResponse {
        tones: Tone::all().iter().map(ToneInfo::from).collect(),
    })
}

/// PUT /api/session/details - Edit the restaurant details.
async fn update_details(
    State(state): State<AppState>,
    Json(update): Json<DetailsUpdate>,
) -> Json<SessionSnapshot> {
    state.session.update_details(update);
    Json(state.session.snapshot())
}

/// PUT /api/session/view - Switch panes.
async fn set_view(
    State(state): State<AppState>,
    Json(request): Json<ViewRequest>,
) -> Json<SessionSnapshot> {
    state.session.set_view(request.view);
    Json(state.session.snapshot())
}

/// POST /api/menu-items - Append a blank item.
async fn add_menu_item(State(state): State<AppState>) -> (StatusCode, Json<MenuItem>) {
    (StatusCode::CREATED, Json(state.session.add_menu_item()))
}

/// PATCH /api/menu-items/{id} - Set the name or price of an item.
async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MenuItemUpdateRequest>,
) -> ApiResult<Json<MenuItem>> {
    if !state
        .session
        .update_menu_item(&id, request.field, &request.value)
    {
        return Err(menu_item_not_found(&id));
    }

    state
        .session
        .config()
        .menu_item(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| menu_item_not_found(&id))
}

/// DELETE /api/menu-items/{id} - Remove an item.
async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.session.remove_menu_item(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(menu_item_not_found(&id))
    }
}

/// POST /api/generate - Ask the model for the three templates.
async fn generate(State(state): State<AppState>) -> ApiResult<Json<GenerateResponse>> {
    let messages = state.session.generate().await?;
    Ok(Json(GenerateResponse {
        messages,
        session: state.session.snapshot(),
    }))
}

/// GET /api/preview - Render the bubbles with the current time.
async fn get_preview(State(state): State<AppState>) -> Json<PreviewResponse> {
    Json(PreviewResponse {
        bubbles: state.session.previews(),
    })
}

/// POST /api/preview/{slot}/copy - Copy one message.
async fn copy_message(
    State(state): State<AppState>,
    Path(slot): Path<String>,
) -> ApiResult<Json<CopyOutcome>> {
    let slot = MessageSlot::from_name(&slot).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::with_details(
                "Unknown message slot",
                format!("{slot} (expected welcome, bill or kitchen)"),
            )),
        )
    })?;

    state.session.copy(slot).await.map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("No messages generated yet")),
        )
    })
}

/// GET /api/export - All generated messages as a downloadable JSON file.
async fn export_messages(State(state): State<AppState>) -> ApiResult<Response> {
    let body = state.session.export().ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("No messages generated yet")),
        )
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"whatsapp-templates.json\"",
            ),
        ],
        body,
    )
        .into_response())
}

fn menu_item_not_found(id: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(format!("Menu item not found: {id}"))),
    )
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the API router with all endpoints and the UI fallback.
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS: the server only listens on the owner's machine.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Session endpoints
        .route("/api/session", get(get_session))
        .route("/api/session/details", put(update_details))
        .route("/api/session/view", put(set_view))
        .route("/api/tones", get(list_tones))
        // Menu endpoints
        .route("/api/menu-items", post(add_menu_item))
        .route(
            "/api/menu-items/{id}",
            patch(update_menu_item).delete(delete_menu_item),
        )
        // Generation and preview
        .route("/api/generate", post(generate))
        .route("/api/preview", get(get_preview))
        .route("/api/preview/{slot}/copy", post(copy_message))
        .route("/api/export", get(export_messages))
        .fallback(static_files::serve_static)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the web server until the process is stopped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_server(session: Session, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(AppState::new(session.clone()));

    if !static_files::has_embedded_assets() {
        tracing::warn!("No embedded UI found; only the JSON API is available");
    }

    info!("Starting {} on http://{}", APP_NAME, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let result = axum::serve(listener, app).await;
    session.close();
    result?;

    Ok(())
}
