//! Episode API endpoints
//!
//! - GET /api/v1/episodes?sort=-episodeNumber
//! - GET /api/v1/episodes/latest - Highest-numbered episode
//! - GET /api/v1/episodes/{id}
//! - POST, PUT /{id}, DELETE /{id} (signed in; accept `?disableRevalidate=true`)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::common::{PaginationQuery, SortQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::PagedResponse;
use crate::models::{CreateEpisodeInput, Episode, EpisodeWithPages, UpdateEpisodeInput};
use crate::services::MutationContext;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_episodes).post(create_episode))
        .route("/latest", get(latest_episode))
        .route(
            "/{id}",
            get(get_episode).put(update_episode).delete(delete_episode),
        )
}

async fn list_episodes(
    State(state): State<AppState>,
    Query(sort): Query<SortQuery>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<Episode>>, ApiError> {
    let result = state
        .episode_service
        .list(sort.sort, &query.params())
        .await?;
    Ok(Json(result.into()))
}

async fn latest_episode(
    State(state): State<AppState>,
) -> Result<Json<EpisodeWithPages>, ApiError> {
    state
        .episode_service
        .latest()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No episodes published yet."))
}

async fn get_episode(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EpisodeWithPages>, ApiError> {
    Ok(Json(state.episode_service.get(id).await?))
}

async fn create_episode(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<CreateEpisodeInput>,
) -> Result<impl IntoResponse, ApiError> {
    let episode = state.episode_service.create(body, ctx).await?;
    Ok((StatusCode::CREATED, Json(episode)))
}

async fn update_episode(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<UpdateEpisodeInput>,
) -> Result<Json<EpisodeWithPages>, ApiError> {
    Ok(Json(state.episode_service.update(id, body, ctx).await?))
}

async fn delete_episode(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
) -> Result<StatusCode, ApiError> {
    state.episode_service.delete(id, ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
