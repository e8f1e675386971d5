//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - Create a user (open until the first exists)
//! - POST /api/v1/auth/login - Email + password login
//! - POST /api/v1/auth/logout - End the current session
//! - GET /api/v1/auth/me - Current user

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    extract_session_token, ApiError, AppState, AuthenticatedUser, MaybeUser, SESSION_COOKIE,
};
use crate::models::{CreateUserInput, User};
use crate::services::UserServiceError;

const SESSION_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub display_name: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name().to_string(),
            email: user.email,
            name: user.name,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Build auth routes; logout and me reject anonymous requests
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

fn session_cookie(token: &str, max_age: i64) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    ))
    .map_err(|e| ApiError::internal_error(e.to_string()))
}

/// POST /api/v1/auth/register
///
/// The first account needs no session and is signed in right away. Later
/// accounts are created by a signed-in user and get no session.
async fn register(
    State(state): State<AppState>,
    MaybeUser(requester): MaybeUser,
    Json(body): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let user = state.user_service.register(body, requester.as_ref()).await?;

    let mut headers = HeaderMap::new();
    let token = if requester.is_none() {
        let session = state.user_service.login(&user.email, &password).await?;
        headers.insert(header::SET_COOKIE, session_cookie(&session.id, SESSION_MAX_AGE)?);
        Some(session.id)
    } else {
        None
    };

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(ip) = extract_ip_address(&headers).and_then(|s| s.parse().ok()) {
        if state.rate_limiter.is_ip_limited(ip).await {
            tracing::warn!("Login rate limit exceeded for {}", ip);
            return Err(ApiError::rate_limited(
                "Too many login requests. Please try again later.",
                60,
            ));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    if state.rate_limiter.is_email_limited(&body.email).await {
        return Err(ApiError::rate_limited(
            "Too many failed login attempts. Please try again in 15 minutes.",
            900,
        ));
    }

    let session = match state.user_service.login(&body.email, &body.password).await {
        Ok(session) => session,
        Err(e) => {
            if matches!(e, UserServiceError::AuthenticationError(_)) {
                state.rate_limiter.record_failed_attempt(&body.email).await;
            }
            return Err(e.into());
        }
    };
    state.rate_limiter.clear_email_attempts(&body.email).await;

    let user = state
        .user_service
        .validate_session(&session.id)
        .await?
        .ok_or_else(|| ApiError::internal_error("Session validation failed"))?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, session_cookie(&session.id, SESSION_MAX_AGE)?);

    Ok((
        response_headers,
        Json(AuthResponse {
            user: user.into(),
            token: Some(session.id),
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;
    state.user_service.logout(&token).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, session_cookie("", 0)?);
    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/auth/me
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// Client address from proxy headers
pub(crate) fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                return Some(ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.trim().to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(extract_ip_address(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_extract_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(extract_ip_address(&headers).as_deref(), Some("10.0.0.2"));
        assert_eq!(extract_ip_address(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_format() {
        let cookie = session_cookie("abc", 60).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
    }
}
