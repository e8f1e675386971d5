//! Social link API endpoints
//!
//! - GET /api/v1/social-links - All links in display order
//! - GET /api/v1/social-links/{id}
//! - POST, PUT /{id}, DELETE /{id} (signed in)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ListResponse;
use crate::models::{CreateSocialLinkInput, SocialLink, UpdateSocialLinkInput};
use crate::services::MutationContext;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_links).post(create_link))
        .route("/{id}", get(get_link).put(update_link).delete(delete_link))
}

async fn list_links(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<SocialLink>>, ApiError> {
    let docs = state.social_link_service.list().await?;
    Ok(Json(ListResponse { docs }))
}

async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SocialLink>, ApiError> {
    Ok(Json(state.social_link_service.get(id).await?))
}

async fn create_link(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<CreateSocialLinkInput>,
) -> Result<impl IntoResponse, ApiError> {
    let link = state.social_link_service.create(body, ctx).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

async fn update_link(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<UpdateSocialLinkInput>,
) -> Result<Json<SocialLink>, ApiError> {
    Ok(Json(state.social_link_service.update(id, body, ctx).await?))
}

async fn delete_link(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
) -> Result<StatusCode, ApiError> {
    state.social_link_service.delete(id, ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
