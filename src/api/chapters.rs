//! Chapter API endpoints
//!
//! - GET /api/v1/chapters?book_id= - Chapters, optionally of one book
//! - GET /api/v1/chapters/{id}
//! - POST, PUT /{id}, DELETE /{id} (signed in)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::PagedResponse;
use crate::models::{Chapter, CreateChapterInput, UpdateChapterInput};

#[derive(Debug, Deserialize)]
pub struct BookFilter {
    #[serde(default)]
    pub book_id: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_chapters).post(create_chapter))
        .route("/{id}", get(get_chapter).put(update_chapter).delete(delete_chapter))
}

async fn list_chapters(
    State(state): State<AppState>,
    Query(filter): Query<BookFilter>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<Chapter>>, ApiError> {
    let result = state
        .chapter_service
        .list(filter.book_id, &query.params())
        .await?;
    Ok(Json(result.into()))
}

async fn get_chapter(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Chapter>, ApiError> {
    Ok(Json(state.chapter_service.get(id).await?))
}

async fn create_chapter(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<CreateChapterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let chapter = state.chapter_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(chapter)))
}

async fn update_chapter(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateChapterInput>,
) -> Result<Json<Chapter>, ApiError> {
    Ok(Json(state.chapter_service.update(id, body).await?))
}

async fn delete_chapter(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.chapter_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
