//! API layer - HTTP handlers and routing
//!
//! Three surfaces share one router:
//! - the admin JSON API under `/api/v1`
//! - the `/next` public endpoints (newsletter signup, revalidation)
//! - the server-rendered site and its static assets

pub mod auth;
pub mod books;
pub mod categories;
pub mod chapters;
pub mod common;
pub mod episodes;
pub mod frontend;
pub mod globals;
pub mod media;
pub mod middleware;
pub mod newsletter;
pub mod next;
pub mod pages;
pub mod posts;
pub mod responses;
pub mod search;
pub mod social_links;
pub mod state;
pub mod static_files;
pub mod users;

#[cfg(test)]
mod tests;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/books", books::router())
        .nest("/chapters", chapters::router())
        .nest("/episodes", episodes::router())
        .nest("/categories", categories::router())
        .nest("/posts", posts::router())
        .nest("/pages", pages::router())
        .nest("/social-links", social_links::router())
        .nest("/newsletter-subscribers", newsletter::subscribers_router())
        .nest("/newsletter-notices", newsletter::notices_router())
        .nest("/media", media::router(state.config.upload.max_file_size))
        .nest("/users", users::router())
        .nest("/globals", globals::router())
        .nest("/search", search::router())
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ))
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    match origin.parse::<HeaderValue>() {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
                .allow_credentials(true),
        ),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
            None
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest("/next", next::router())
        .merge(static_files::router())
        .merge(frontend::router())
        .fallback(frontend::fallback);

    if let Some(cors) = cors_layer(&state.config.server.cors_origin) {
        router = router.layer(cors);
    }

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
