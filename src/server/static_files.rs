//! Static file serving for the embedded chat frontend
//!
//! Uses rust-embed to bundle the static/ folder into the binary.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;

/// Embedded frontend assets from the static/ folder
#[derive(Embed)]
#[folder = "static/"]
struct FrontendAssets;

/// Serve embedded static files, falling back to index.html for page routes
pub async fn serve_static(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    if let Some(response) = serve_file(path) {
        return response;
    }

    if !path.contains('.') {
        if let Some(response) = serve_file("index.html") {
            return response;
        }
    }

    (StatusCode::NOT_FOUND, "Not found").into_response()
}

/// Serve a specific file from embedded assets
fn serve_file(path: &str) -> Option<Response> {
    let file = FrontendAssets::get(path)?;

    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    Some(
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime_type),
                (
                    header::CACHE_CONTROL,
                    "public, max-age=0, must-revalidate".to_string(),
                ),
            ],
            file.data.into_owned(),
        )
            .into_response(),
    )
}

/// Check if frontend assets are embedded
pub fn has_embedded_frontend() -> bool {
    FrontendAssets::get("index.html").is_some()
}
