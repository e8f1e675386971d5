//! HTTP tests against the full router

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use super::{build_router, AppState};
use crate::config::{Config, MailProvider};
use crate::db::{create_test_pool, migrations};
use crate::models::{CreateEpisodeInput, EpisodePageInput};
use crate::services::media::{UploadMeta, UploadedFile};
use crate::services::revalidation::REVALIDATE_SECRET_HEADER;
use crate::services::MutationContext;

const TEST_SECRET: &str = "test-revalidate-secret";

struct TestApp {
    server: TestServer,
    state: AppState,
    _uploads: TempDir,
}

async fn test_app() -> TestApp {
    let uploads = TempDir::new().unwrap();
    let mut config = Config::default();
    config.upload.path = uploads.path().to_path_buf();
    config.newsletter.provider = MailProvider::Log;
    config.revalidation.secret = Some(TEST_SECRET.to_string());

    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();
    let state = AppState::from_config(config, pool).await.unwrap();
    let server = TestServer::new(build_router(state.clone())).unwrap();

    TestApp {
        server,
        state,
        _uploads: uploads,
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

/// Register the first user and return its session token
async fn sign_in(app: &TestApp) -> String {
    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "editor@example.com",
            "password": "correct-horse-battery",
            "name": "Editor"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// A published one-page episode
async fn seed_episode(app: &TestApp, slug: &str, number: i64) {
    let image = app
        .state
        .media_service
        .upload(
            UploadedFile {
                original_name: format!("{}.png", slug),
                content_type: "image/png".to_string(),
                data: vec![0x89, b'P', b'N', b'G'],
            },
            UploadMeta {
                alt: format!("{} art", slug),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    app.state
        .episode_service
        .create(
            CreateEpisodeInput {
                title: format!("Episode {}", slug),
                slug: Some(slug.to_string()),
                episode_number: number,
                chapter_id: None,
                publish_date: Utc.with_ymd_and_hms(2025, 1, number as u32, 12, 0, 0).unwrap(),
                thumbnail_id: Some(image.id),
                author_notes: None,
                seo_title: None,
                seo_description: None,
                pages: vec![EpisodePageInput {
                    image_id: image.id,
                    alt_text: None,
                    page_title: None,
                    caption: None,
                }],
            },
            MutationContext::quiet(),
        )
        .await
        .unwrap();
}

// ---- /next ----

#[tokio::test]
async fn test_newsletter_signup_statuses() {
    let app = test_app().await;

    let invalid = app
        .server
        .post("/next/newsletter")
        .json(&json!({ "email": "not-an-email" }))
        .await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

    let created = app
        .server
        .post("/next/newsletter")
        .json(&json!({ "email": "Reader@Example.com" }))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    assert_eq!(created.json::<Value>()["message"], "Subscribed successfully.");

    let again = app
        .server
        .post("/next/newsletter")
        .json(&json!({ "email": "reader@example.com" }))
        .await;
    assert_eq!(again.status_code(), StatusCode::OK);
    assert_eq!(again.json::<Value>()["message"], "You are already subscribed.");
}

#[tokio::test]
async fn test_newsletter_signup_without_email() {
    let app = test_app().await;
    let response = app.server.post("/next/newsletter").text("garbage").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_revalidate_requires_secret() {
    let app = test_app().await;

    let missing = app.server.post("/next/revalidate-episodes").await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json::<Value>()["message"], "Unauthorized");

    let wrong = app
        .server
        .post("/next/revalidate-episodes")
        .add_header(
            HeaderName::from_static(REVALIDATE_SECRET_HEADER),
            HeaderValue::from_static("nope"),
        )
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);

    let ok = app
        .server
        .post("/next/revalidate-episodes")
        .add_header(
            HeaderName::from_static(REVALIDATE_SECRET_HEADER),
            HeaderValue::from_static(TEST_SECRET),
        )
        .await;
    assert_eq!(ok.status_code(), StatusCode::OK);
    let body = ok.json::<Value>();
    assert_eq!(body["revalidated"], true);
    assert_eq!(body["tags"].as_array().map(Vec::len), Some(2));
}

// ---- admin API ----

#[tokio::test]
async fn test_first_user_bootstrap() {
    let app = test_app().await;
    let token = sign_in(&app).await;

    let me = app
        .server
        .get("/api/v1/auth/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(me.status_code(), StatusCode::OK);
    assert_eq!(me.json::<Value>()["email"], "editor@example.com");

    let anonymous = app.server.get("/api/v1/auth/me").await;
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

    // Registration closes once a user exists
    let second = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "other@example.com", "password": "another-long-password" }))
        .await;
    assert_eq!(second.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_writes_require_authentication() {
    let app = test_app().await;

    let response = app
        .server
        .post("/api/v1/categories")
        .json(&json!({ "title": "News" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app.server.delete("/api/v1/episodes/1").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app.server.get("/api/v1/newsletter-subscribers").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_draft_posts_hidden_from_anonymous_readers() {
    let app = test_app().await;
    let token = sign_in(&app).await;

    let created = app
        .server
        .post("/api/v1/posts")
        .add_query_param("disableRevalidate", true)
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "title": "Draft Notes", "content": "Work in progress" }))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    let id = created.json::<Value>()["id"].as_i64().unwrap();

    let anonymous = app.server.get(&format!("/api/v1/posts/{}", id)).await;
    assert_eq!(anonymous.status_code(), StatusCode::NOT_FOUND);

    let listed = app.server.get("/api/v1/posts").await;
    assert_eq!(listed.json::<Value>()["total"], 0);

    let editor = app
        .server
        .get(&format!("/api/v1/posts/{}", id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(editor.status_code(), StatusCode::OK);
    assert_eq!(editor.json::<Value>()["title"], "Draft Notes");
}

#[tokio::test]
async fn test_latest_episode_endpoint() {
    let app = test_app().await;

    let empty = app.server.get("/api/v1/episodes/latest").await;
    assert_eq!(empty.status_code(), StatusCode::NOT_FOUND);

    seed_episode(&app, "first", 1).await;
    seed_episode(&app, "second", 2).await;

    let latest = app.server.get("/api/v1/episodes/latest").await;
    assert_eq!(latest.status_code(), StatusCode::OK);
    assert_eq!(latest.json::<Value>()["slug"], "second");
}

// ---- frontend ----

#[tokio::test]
async fn test_archive_lists_episodes() {
    let app = test_app().await;
    seed_episode(&app, "first", 1).await;

    let response = app.server.get("/archive").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains("Episode first"));
    // Autoescape writes '/' as &#x2F;
    assert!(html.contains("href=\"&#x2F;episode&#x2F;first&#x2F;1\""));
    assert!(html.contains("<title>Archive"));
}

#[tokio::test]
async fn test_reader_routes() {
    let app = test_app().await;
    seed_episode(&app, "first", 1).await;

    let page = app.server.get("/episode/first/1").await;
    assert_eq!(page.status_code(), StatusCode::OK);
    assert!(page.text().contains("Page 1 of 1"));

    let past_end = app.server.get("/episode/first/9").await;
    assert_eq!(past_end.status_code(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(past_end.header(header::LOCATION), "/episode/first/1");

    for path in ["/episode/first/0", "/episode/first/abc", "/episode/missing/1"] {
        let response = app.server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{}", path);
        assert!(response.text().contains("Page not found"));
    }
}

#[tokio::test]
async fn test_posts_pagination_bounds() {
    let app = test_app().await;

    let first = app.server.get("/posts").await;
    assert_eq!(first.status_code(), StatusCode::OK);

    let beyond = app.server.get("/posts/page/2").await;
    assert_eq!(beyond.status_code(), StatusCode::NOT_FOUND);

    let integral = app.server.get("/posts/page/1.0").await;
    assert_eq!(integral.status_code(), StatusCode::OK);

    // Must not wrap around to page 1
    let overflow = app.server.get("/posts/page/4294967297").await;
    assert_eq!(overflow.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_home_landing_without_episodes() {
    let app = test_app().await;
    let response = app.server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("No episodes published yet."));
}

#[tokio::test]
async fn test_unknown_page_renders_not_found() {
    let app = test_app().await;
    let response = app.server.get("/no-such-page").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let nested = app.server.get("/a/b/c").await;
    assert_eq!(nested.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stylesheet_is_served() {
    let app = test_app().await;
    let response = app.server.get("/styles.css").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "text/css");
}
