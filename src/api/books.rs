//! Book API endpoints
//!
//! - GET /api/v1/books, GET /api/v1/books/{id}
//! - POST, PUT /{id}, DELETE /{id} (signed in)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::PagedResponse;
use crate::models::{Book, CreateBookInput, UpdateBookInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
}

async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<Book>>, ApiError> {
    let result = state.book_service.list(&query.params()).await?;
    Ok(Json(result.into()))
}

async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.book_service.get(id).await?))
}

async fn create_book(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<CreateBookInput>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.book_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBookInput>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.book_service.update(id, body).await?))
}

async fn delete_book(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.book_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
