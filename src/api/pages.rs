//! Page API endpoints
//!
//! - GET /api/v1/pages?status= - Anonymous callers only see published pages
//! - GET /api/v1/pages/{id}
//! - GET /api/v1/pages/{id}/versions
//! - POST /api/v1/pages/{id}/versions/{version_id}/restore
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
use crate::models::{CreatePageInput, Page, PageVersion, PublishStatus, UpdatePageInput};
use crate::services::MutationContext;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pages).post(create_page))
        .route("/{id}", get(get_page).put(update_page).delete(delete_page))
        .route("/{id}/versions", get(list_versions))
        .route(
            "/{id}/versions/{version_id}/restore",
            post(restore_version),
        )
}

async fn list_pages(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(filter): Query<StatusQuery>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<Page>>, ApiError> {
    let status = match user {
        Some(_) => filter.status,
        None => Some(PublishStatus::Published),
    };
    let result = state.page_service.list(status, &query.params()).await?;
    Ok(Json(result.into()))
}

async fn get_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<Page>, ApiError> {
    let page = state.page_service.get(id).await?;
    if user.is_none() && !page.is_published() {
        return Err(ApiError::not_found(format!("Page not found: {}", id)));
    }
    Ok(Json(page))
}

async fn create_page(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<CreatePageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.page_service.create(body, ctx).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn update_page(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<UpdatePageInput>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(state.page_service.update(id, body, ctx).await?))
}

async fn delete_page(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
) -> Result<StatusCode, ApiError> {
    state.page_service.delete(id, ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_versions(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<ListResponse<PageVersion>>, ApiError> {
    let docs = state.page_service.list_versions(id).await?;
    Ok(Json(ListResponse { docs }))
}

async fn restore_version(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, version_id)): Path<(i64, i64)>,
    Query(ctx): Query<MutationContext>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(
        state
            .page_service
            .restore_version(id, version_id, ctx)
            .await?,
    ))
}
