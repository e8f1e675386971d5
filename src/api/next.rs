//! Public route handlers
//!
//! - POST /next/newsletter - Newsletter signup from the site
//! - POST /next/revalidate-episodes - Drop the episode caches (shared secret)
//!
//! Both answer with `{ "message": ... }` bodies rather than [`ApiError`].
//!
//! [`ApiError`]: crate::api::middleware::ApiError

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::middleware::AppState;
use crate::services::newsletter::INVALID_EMAIL;
use crate::services::revalidation::REVALIDATE_SECRET_HEADER;
use crate::services::SubscribeOutcome;

pub const ALREADY_SUBSCRIBED: &str = "You are already subscribed.";
pub const SUBSCRIBED: &str = "Subscribed successfully.";
pub const SIGNUP_FAILED: &str = "Something went wrong. Please try again.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/newsletter", post(newsletter_signup))
        .route("/revalidate-episodes", post(revalidate_episodes))
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: &'static str,
}

fn message(status: StatusCode, message: &'static str) -> Response {
    (status, Json(MessageBody { message })).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct SignupBody {
    #[serde(default)]
    email: Option<serde_json::Value>,
}

/// Email from the request body; anything unparseable counts as missing
fn signup_email(body: &[u8]) -> String {
    serde_json::from_slice::<SignupBody>(body)
        .ok()
        .and_then(|b| b.email)
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// POST /next/newsletter
async fn newsletter_signup(State(state): State<AppState>, body: Bytes) -> Response {
    let email = signup_email(&body);

    match state.newsletter_service.subscribe(&email).await {
        Ok(SubscribeOutcome::InvalidEmail) => message(StatusCode::BAD_REQUEST, INVALID_EMAIL),
        Ok(SubscribeOutcome::AlreadySubscribed) => message(StatusCode::OK, ALREADY_SUBSCRIBED),
        Ok(SubscribeOutcome::Created(_)) => message(StatusCode::CREATED, SUBSCRIBED),
        Err(e) => {
            tracing::error!("Newsletter signup failed: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, SIGNUP_FAILED)
        }
    }
}

/// POST /next/revalidate-episodes
async fn revalidate_episodes(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let provided = headers
        .get(REVALIDATE_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if !state.revalidator.verify_secret(provided) {
        return message(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let tags = state.revalidator.revalidate_episode_tags().await;
    (
        StatusCode::OK,
        Json(json!({ "revalidated": true, "tags": tags })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_email_is_lenient() {
        assert_eq!(signup_email(br#"{"email":"Reader@Example.com"}"#), "Reader@Example.com");
        assert_eq!(signup_email(br#"{"email":42}"#), "");
        assert_eq!(signup_email(br#"{}"#), "");
        assert_eq!(signup_email(b"not json"), "");
        assert_eq!(signup_email(b""), "");
    }
}
