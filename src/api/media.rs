//! Media API endpoints
//!
//! - GET /api/v1/media, GET /api/v1/media/{id}
//! - POST /api/v1/media - multipart upload (signed in)
//! - PUT /{id}, DELETE /{id} (signed in)
//!
//! The upload form carries a `file` field plus optional `alt`, `caption`,
//! `cloudinary_public_id`, `width` and `height` text fields.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::PagedResponse;
use crate::models::{Media, UpdateMediaInput};
use crate::services::media::{UploadMeta, UploadedFile};

/// Multipart overhead allowed on top of the configured file size
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn router(max_file_size: u64) -> Router<AppState> {
    Router::new()
        .route("/", get(list_media).post(upload_media))
        .route("/{id}", get(get_media).put(update_media).delete(delete_media))
        .layer(DefaultBodyLimit::max(max_file_size as usize + FORM_OVERHEAD))
}

async fn list_media(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<Media>>, ApiError> {
    let result = state.media_service.list(&query.params()).await?;
    Ok(Json(result.into()))
}

async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Media>, ApiError> {
    Ok(Json(state.media_service.get(id).await?))
}

/// POST /api/v1/media
async fn upload_media(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file = None;
    let mut meta = UploadMeta::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;
            file = Some(UploadedFile {
                original_name,
                content_type,
                data: data.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read field {}: {}", name, e)))?;
        match name.as_str() {
            "alt" => meta.alt = value,
            "caption" => meta.caption = Some(value),
            "cloudinary_public_id" => meta.cloudinary_public_id = Some(value),
            "width" => meta.width = parse_dimension(&name, &value)?,
            "height" => meta.height = parse_dimension(&name, &value)?,
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::validation_error("No file provided"))?;
    let media = state.media_service.upload(file, meta).await?;
    Ok((StatusCode::CREATED, Json(media)))
}

fn parse_dimension(name: &str, value: &str) -> Result<Option<i64>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .ok()
        .filter(|v| *v > 0)
        .map(Some)
        .ok_or_else(|| ApiError::validation_error(format!("{} must be a positive integer", name)))
}

async fn update_media(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateMediaInput>,
) -> Result<Json<Media>, ApiError> {
    Ok(Json(state.media_service.update(id, body).await?))
}

async fn delete_media(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.media_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
