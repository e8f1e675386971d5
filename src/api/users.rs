//! User API endpoints (all signed in)
//!
//! - GET /api/v1/users, GET /api/v1/users/{id}
//! - PUT /api/v1/users/{id}, DELETE /api/v1/users/{id}
//!
//! New users are created through `/auth/register`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::auth::UserResponse;
use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::PagedResponse;
use crate::models::UpdateUserInput;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}

async fn list_users(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<UserResponse>>, ApiError> {
    let result = state.user_service.list(&query.params()).await?;
    Ok(Json(result.map(UserResponse::from).into()))
}

async fn get_user(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.user_service.get(id).await?.into()))
}

async fn update_user(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserInput>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.user_service.update(id, body).await?.into()))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if user.id == id {
        return Err(ApiError::validation_error("You cannot delete your own account."));
    }
    state.user_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
