//! Category API endpoints
//!
//! - GET /api/v1/categories, GET /api/v1/categories/{id}
//! - GET /api/v1/categories/{id}/posts - Published posts in the category
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
use crate::api::responses::{ListResponse, PagedResponse};
use crate::models::{Category, CreateCategoryInput, Post, UpdateCategoryInput};
use crate::services::MutationContext;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/{id}/posts", get(category_posts))
}

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<Category>>, ApiError> {
    let result = state.category_service.list(&query.params()).await?;
    Ok(Json(result.into()))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.get(id).await?))
}

async fn category_posts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ListResponse<Post>>, ApiError> {
    let category = state.category_service.get(id).await?;
    let docs = state
        .post_service
        .list_published_by_category(category.id)
        .await?;
    Ok(Json(ListResponse { docs }))
}

async fn create_category(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.category_service.create(body, ctx).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.update(id, body, ctx).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id, ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
