//! Static file serving
//!
//! - Embedded assets from `public/` (`/styles.css`, `/placeholder-thumbnail.jpg`)
//! - Uploaded media from the upload directory under `/uploads/*`

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use rust_embed::RustEmbed;
use std::path::{Component, PathBuf};
use tokio::fs;

use crate::api::middleware::{cache_control_static, AppState};

const ONE_YEAR: u32 = 31_536_000;
const ONE_HOUR: u32 = 3_600;

#[derive(RustEmbed)]
#[folder = "public/"]
struct PublicAssets;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/styles.css", get(|| async { embedded_or_404("styles.css") }))
        .route(
            "/placeholder-thumbnail.jpg",
            get(|| async { embedded_or_404("placeholder-thumbnail.jpg") }),
        )
        .route("/uploads/{*path}", get(serve_upload))
}

/// Serve an embedded asset by its path relative to `public/`
pub fn serve_embedded(path: &str) -> Option<Response> {
    let path = path.trim_start_matches('/');
    let content = PublicAssets::get(path)?;
    Some(build_response(
        path,
        content.data.into_owned(),
        &cache_control_static(ONE_HOUR, false),
    ))
}

fn embedded_or_404(path: &str) -> Response {
    serve_embedded(path).unwrap_or_else(|| StatusCode::NOT_FOUND.into_response())
}

/// GET /uploads/{*path}
async fn serve_upload(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let Some(relative) = safe_relative_path(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let file_path = state.config.upload.path.join(relative);

    match fs::read(&file_path).await {
        Ok(contents) => build_response(&path, contents, &cache_control_static(ONE_YEAR, true)),
        Err(e) => {
            tracing::debug!("Upload {} not served: {}", file_path.display(), e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Reject absolute paths and `..` so requests stay inside the upload dir
fn safe_relative_path(path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(path).ok()?;
    let candidate = PathBuf::from(decoded.as_ref());
    if candidate.as_os_str().is_empty() {
        return None;
    }
    candidate
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(candidate)
}

fn build_response(path: &str, data: Vec<u8>, cache_control: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, get_content_type(path).to_string()),
            (header::CACHE_CONTROL, cache_control.to_string()),
        ],
        Body::from(data),
    )
        .into_response()
}

/// Content type from the file extension
fn get_content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("").to_ascii_lowercase().as_str() {
        "css" => "text/css",
        "js" => "application/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
