//! Post API endpoints
//!
//! - GET /api/v1/posts?status= - Anonymous callers only see published posts
//! - GET /api/v1/posts/{id}
//! - GET /api/v1/posts/{id}/versions
//! - POST /api/v1/posts/{id}/versions/{version_id}/restore
//! - POST, PUT /{id}, DELETE /{id} (signed in)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::{PaginationQuery, StatusQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::api::responses::{ListResponse, PagedResponse};
use crate::models::{CreatePostInput, Post, PostVersion, PublishStatus, UpdatePostInput};
use crate::services::MutationContext;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/{id}/versions", get(list_versions))
        .route(
            "/{id}/versions/{version_id}/restore",
            post(restore_version),
        )
}

async fn list_posts(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(filter): Query<StatusQuery>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<Post>>, ApiError> {
    let status = match user {
        Some(_) => filter.status,
        None => Some(PublishStatus::Published),
    };
    let result = state.post_service.list(status, &query.params()).await?;
    Ok(Json(result.into()))
}

async fn get_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<Post>, ApiError> {
    let post = state.post_service.get(id).await?;
    if user.is_none() && !post.is_published() {
        return Err(ApiError::not_found(format!("Post not found: {}", id)));
    }
    Ok(Json(post))
}

async fn create_post(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.post_service.create(body, ctx).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.post_service.update(id, body, ctx).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(id, ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_versions(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<ListResponse<PostVersion>>, ApiError> {
    let docs = state.post_service.list_versions(id).await?;
    Ok(Json(ListResponse { docs }))
}

async fn restore_version(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, version_id)): Path<(i64, i64)>,
    Query(ctx): Query<MutationContext>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(
        state
            .post_service
            .restore_version(id, version_id, ctx)
            .await?,
    ))
}
