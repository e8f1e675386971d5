//! Global document endpoints
//!
//! - GET /api/v1/globals/{site-settings,header,footer} - Stored document or defaults
//! - PUT /api/v1/globals/{site-settings,header,footer} - Replace (signed in)

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Footer, GlobalDocument, Header, SiteSettings};
use crate::services::MutationContext;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(global_route::<SiteSettings>())
        .merge(global_route::<Header>())
        .merge(global_route::<Footer>())
}

fn global_route<T: GlobalDocument>() -> Router<AppState> {
    Router::new().route(
        &format!("/{}", T::NAME),
        get(get_global::<T>).put(put_global::<T>),
    )
}

async fn get_global<T: GlobalDocument>(
    State(state): State<AppState>,
) -> Result<Json<T>, ApiError> {
    Ok(Json(state.globals_service.get::<T>().await?))
}

async fn put_global<T: GlobalDocument>(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<T>,
) -> Result<Json<T>, ApiError> {
    Ok(Json(state.globals_service.update(body, ctx).await?))
}
