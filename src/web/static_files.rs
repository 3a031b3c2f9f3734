//! Embedded single-page UI.
//!
//! The form and chat preview live in `web/` and are compiled into the binary,
//! so the server is a single file to run. Unknown non-file paths fall back to
//! `index.html`.

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;
use std::path::Path;

/// Embedded UI files from the `web` directory.
#[derive(Embed)]
#[folder = "web/"]
pub struct StaticAssets;

/// Serves static files with SPA fallback.
///
/// 1. Serves the exact path if embedded
/// 2. Returns 404 for missing paths that look like files
/// 3. Serves `index.html` for everything else
pub async fn serve_static(request: Request) -> Response {
    let path = request.uri().path().trim_start_matches('/');

    if path.is_empty() {
        return serve_file("index.html");
    }

    if let Some(content) = StaticAssets::get(path) {
        return file_response(path, content.data.as_ref());
    }

    if looks_like_file(path) || path.starts_with("api/") {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }

    serve_file("index.html")
}

fn looks_like_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| !ext.is_empty())
}

fn serve_file(path: &str) -> Response {
    match StaticAssets::get(path) {
        Some(content) => file_response(path, content.data.as_ref()),
        None => (StatusCode::NOT_FOUND, "File not found").into_response(),
    }
}

/// Creates an HTTP response for a file with appropriate content type.
fn file_response(path: &str, content: &[u8]) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CACHE_CONTROL, cache_control_for_path(path))
        .body(Body::from(content.to_vec()))
        .unwrap_or_else(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create response",
            )
                .into_response()
        })
}

/// HTML is always revalidated; other assets are cached for an hour.
fn cache_control_for_path(path: &str) -> &'static str {
    if Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
    {
        "no-cache, must-revalidate"
    } else {
        "public, max-age=3600"
    }
}

/// Returns true if the UI was embedded at compile time.
#[must_use]
pub fn has_embedded_assets() -> bool {
    StaticAssets::get("index.html").is_some()
}
