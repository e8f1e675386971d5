//! GET /api/v1/search?q= - Episodes first, then posts

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::SearchQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ListResponse;
use crate::services::SearchResult;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(search))
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListResponse<SearchResult>>, ApiError> {
    let docs = state.search_service.search(&query.q).await?;
    Ok(Json(ListResponse { docs }))
}
