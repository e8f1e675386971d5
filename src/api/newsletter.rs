//! Newsletter admin endpoints (all signed in)
//!
//! - /api/v1/newsletter-subscribers - CRUD over subscribers
//! - /api/v1/newsletter-notices - CRUD over notices. Saving a notice with
//!   `send_notice: true` emails every subscriber.
//! - POST /api/v1/newsletter-notices/preview - Render without saving

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::PagedResponse;
use crate::models::{NewsletterNotice, NewsletterSubscriber, NoticeEmail, NoticeInput, SubscriberInput};
use crate::services::MutationContext;

pub fn subscribers_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscribers).post(create_subscriber))
        .route(
            "/{id}",
            get(get_subscriber)
                .put(update_subscriber)
                .delete(delete_subscriber),
        )
}

pub fn notices_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notices).post(create_notice))
        .route("/preview", post(preview_notice))
        .route(
            "/{id}",
            get(get_notice).put(update_notice).delete(delete_notice),
        )
}

async fn list_subscribers(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<NewsletterSubscriber>>, ApiError> {
    let result = state
        .newsletter_service
        .list_subscribers(&query.params())
        .await?;
    Ok(Json(result.into()))
}

async fn get_subscriber(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<NewsletterSubscriber>, ApiError> {
    Ok(Json(state.newsletter_service.get_subscriber(id).await?))
}

async fn create_subscriber(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<SubscriberInput>,
) -> Result<impl IntoResponse, ApiError> {
    let subscriber = state.newsletter_service.create_subscriber(body).await?;
    Ok((StatusCode::CREATED, Json(subscriber)))
}

async fn update_subscriber(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<SubscriberInput>,
) -> Result<Json<NewsletterSubscriber>, ApiError> {
    Ok(Json(
        state.newsletter_service.update_subscriber(id, body).await?,
    ))
}

async fn delete_subscriber(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.newsletter_service.delete_subscriber(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_notices(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<NewsletterNotice>>, ApiError> {
    let result = state
        .newsletter_service
        .list_notices(&query.params())
        .await?;
    Ok(Json(result.into()))
}

async fn get_notice(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<NewsletterNotice>, ApiError> {
    Ok(Json(state.newsletter_service.get_notice(id).await?))
}

async fn create_notice(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<NoticeInput>,
) -> Result<impl IntoResponse, ApiError> {
    let notice = state.newsletter_service.create_notice(body, ctx).await?;
    Ok((StatusCode::CREATED, Json(notice)))
}

async fn update_notice(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(ctx): Query<MutationContext>,
    Json(body): Json<NoticeInput>,
) -> Result<Json<NewsletterNotice>, ApiError> {
    Ok(Json(
        state
            .newsletter_service
            .update_notice(id, body, ctx)
            .await?,
    ))
}

async fn delete_notice(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.newsletter_service.delete_notice(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn preview_notice(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<NoticeInput>,
) -> Result<Json<NoticeEmail>, ApiError> {
    Ok(Json(state.newsletter_service.preview(body).await?))
}
