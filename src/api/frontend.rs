//! Server-rendered public site
//!
//! - GET / - Home page, or the landing with the latest episode
//! - GET /archive - Every episode, newest first
//! - GET /episode/{slug}/{page} - Page-by-page reader
//! - GET /search?q=
//! - GET /posts, GET /posts/page/{n}, GET /posts/{slug}
//! - GET /categories/{slug}
//! - GET /{slug} - CMS page
//!
//! Every page carries the header and footer globals, the site font and the
//! tab title. Unknown content renders the themed 404 page.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use tera::Context as TeraContext;

use crate::api::common::SearchQuery;
use crate::api::middleware::AppState;
use crate::api::static_files;
use crate::models::{
    Block, Font, Footer, Header, Media, NewsletterSignupBlock, Page, Post, SiteSettings,
};
use crate::services::globals::resolve_url;
use crate::services::media::PLACEHOLDER_THUMBNAIL;
use crate::services::{
    build_tab_title, CategoryServiceError, EpisodeServiceError, GlobalsServiceError,
    MarkdownRenderer, MediaServiceError, PageServiceError, PostServiceError,
    SocialLinkServiceError,
};
use crate::theme::view::{
    format_publish_date, page_alt, pagination, range_line, reader_nav, ArchiveCard, HeroView,
    PostCard, RenderedBlock, SignupView,
};
use crate::theme::{FooterSocialLink, NavLink, StandardTemplateVars};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/archive", get(archive))
        .route("/episode/{slug}/{page}", get(episode_reader))
        .route("/search", get(search))
        .route("/posts", get(posts_index))
        .route("/posts/page/{page}", get(posts_page))
        .route("/posts/{slug}", get(post_detail))
        .route("/categories/{slug}", get(category))
        .route("/{slug}", get(cms_page))
}

/// A page ready to render, or somewhere else to go
enum Rendered {
    Page(PageRender),
    Redirect(String),
}

struct PageRender {
    template: &'static str,
    context: TeraContext,
    title: Option<String>,
    description: Option<String>,
    font_override: Option<String>,
    og_image: Option<String>,
}

impl PageRender {
    fn new(template: &'static str, context: TeraContext) -> Self {
        Self {
            template,
            context,
            title: None,
            description: None,
            font_override: None,
            og_image: None,
        }
    }

    fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    fn font_override(mut self, font: &str) -> Self {
        self.font_override = Some(font.to_string());
        self
    }

    fn og_image(mut self, url: Option<String>) -> Self {
        self.og_image = url;
        self
    }
}

#[derive(Debug)]
enum FrontendError {
    NotFound,
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for FrontendError {
    fn from(e: anyhow::Error) -> Self {
        FrontendError::Internal(e)
    }
}

macro_rules! internal_from {
    ($($error:ty),*) => {
        $(impl From<$error> for FrontendError {
            fn from(e: $error) -> Self {
                FrontendError::Internal(anyhow::Error::new(e))
            }
        })*
    };
}

internal_from!(
    EpisodeServiceError,
    PostServiceError,
    PageServiceError,
    CategoryServiceError,
    MediaServiceError,
    GlobalsServiceError,
    SocialLinkServiceError
);

type PageResult = Result<Rendered, FrontendError>;

async fn respond(state: &AppState, path: &str, result: PageResult) -> Response {
    match result {
        Ok(Rendered::Page(page)) => {
            let vars = standard_vars(state, path, &page).await;
            let html = state
                .theme_engine
                .render_page(page.template, &page.context, &vars);
            Html(html).into_response()
        }
        Ok(Rendered::Redirect(to)) => Redirect::temporary(&to).into_response(),
        Err(FrontendError::NotFound) => not_found_page(state, path).await,
        Err(FrontendError::Internal(e)) => {
            tracing::error!("Failed to render {}: {:#}", path, e);
            error_page(
                state,
                path,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                "This page could not be loaded. Please try again.",
            )
            .await
        }
    }
}

/// Themed 404 page
pub async fn not_found_page(state: &AppState, path: &str) -> Response {
    error_page(
        state,
        path,
        StatusCode::NOT_FOUND,
        "Page not found",
        "The page you are looking for does not exist.",
    )
    .await
}

async fn error_page(
    state: &AppState,
    path: &str,
    status: StatusCode,
    title: &str,
    message: &str,
) -> Response {
    let mut context = TeraContext::new();
    context.insert("status", &status.as_u16());
    context.insert("error_title", title);
    context.insert("error_message", message);
    let page = PageRender::new("error.html", context).title(title);
    let vars = standard_vars(state, path, &page).await;
    let html = state
        .theme_engine
        .render_page("error.html", &page.context, &vars);
    (status, Html(html)).into_response()
}

/// Router fallback: embedded assets, then the 404 page
pub async fn fallback(State(state): State<AppState>, uri: Uri) -> Response {
    match static_files::serve_embedded(uri.path()) {
        Some(response) => response,
        None => not_found_page(&state, uri.path()).await,
    }
}

/// Header, footer, fonts and metadata shared by every page.
///
/// Chrome never fails a page; lookup errors are logged and defaults used.
async fn standard_vars(state: &AppState, path: &str, page: &PageRender) -> StandardTemplateVars {
    let globals = &state.globals_service;
    let site: SiteSettings = globals.get().await.unwrap_or_else(|e| {
        tracing::error!("Failed to load site settings: {}", e);
        SiteSettings::default()
    });
    let header: Header = globals.get().await.unwrap_or_else(|e| {
        tracing::error!("Failed to load header: {}", e);
        Header::default()
    });
    let footer: Footer = globals.get().await.unwrap_or_else(|e| {
        tracing::error!("Failed to load footer: {}", e);
        Footer::default()
    });

    let mut vars = StandardTemplateVars::new(site.title(), path);
    vars.tab_title = build_tab_title(site.title(), page.title.as_deref());
    vars.font_class = Font::effective(site.default_font, page.font_override.as_deref()).class_name();
    vars.favicon_url = globals.favicon_url(&site).await.unwrap_or_else(|e| {
        tracing::warn!("Failed to resolve favicon: {}", e);
        None
    });

    let media_ids: Vec<i64> = [
        header.brand.logo_media_id,
        footer.brand.logo_media_id,
        footer.background_media_id,
    ]
    .into_iter()
    .flatten()
    .collect();
    let media = state
        .media_service
        .get_many(&media_ids)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load header/footer media: {}", e);
            HashMap::new()
        });
    let url_of = |id: Option<i64>| id.and_then(|id| media.get(&id)).map(|m| m.url.clone());
    vars.header_logo_url = url_of(header.brand.logo_media_id);
    vars.footer_logo_url = url_of(footer.brand.logo_media_id);
    vars.footer_background_url = url_of(footer.background_media_id);

    vars.header_nav = NavLink::from_links(&header.nav_items);
    vars.header_cta = header
        .cta_link
        .enabled
        .then(|| NavLink::from_link(&header.cta_link.link))
        .flatten();
    vars.footer_nav = NavLink::from_links(&footer.nav_items);
    vars.legal_links = NavLink::from_links(&footer.legal.legal_links);
    vars.social_links = state
        .social_link_service
        .for_footer(&footer.social_link_ids)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load social links: {}", e);
            Vec::new()
        })
        .into_iter()
        .map(|link| FooterSocialLink {
            label: link.label,
            platform: link.platform.as_str().to_string(),
            url: link.url,
        })
        .collect();

    if let Some(description) = &page.description {
        vars.description = description.clone();
        vars.og.description = description.clone();
    }
    vars.og.title = vars.tab_title.clone();
    vars.og.url = resolve_url(globals.server_url(), path);
    vars.og.image = page.og_image.clone();
    vars.header = header;
    vars.footer = footer;
    vars
}

fn media_url(media: Option<&Media>) -> Option<String> {
    media.map(|m| m.url.clone()).filter(|u| !u.is_empty())
}

// ---- home, archive, reader ----

/// GET /
async fn home(State(state): State<AppState>) -> Response {
    let result = home_page(&state).await;
    respond(&state, "/", result).await
}

async fn home_page(state: &AppState) -> PageResult {
    if let Some(page) = state.page_service.home().await? {
        return cms_page_render(state, page).await;
    }

    let mut context = TeraContext::new();
    let latest = state.episode_service.cached_latest().await?;
    context.insert("latest", &latest.as_ref().map(ArchiveCard::from));
    context.insert(
        "signup",
        &SignupView::new(NewsletterSignupBlock::default(), None),
    );
    Ok(Rendered::Page(PageRender::new("home.html", context)))
}

/// GET /archive
async fn archive(State(state): State<AppState>) -> Response {
    let result = archive_page(&state).await;
    respond(&state, "/archive", result).await
}

async fn archive_page(state: &AppState) -> PageResult {
    let cards: Vec<ArchiveCard> = state
        .episode_service
        .cached_archive()
        .await?
        .iter()
        .filter(|c| !c.slug.trim().is_empty() && !c.title.trim().is_empty())
        .map(ArchiveCard::from)
        .collect();

    let mut context = TeraContext::new();
    context.insert("episodes", &cards);
    Ok(Rendered::Page(
        PageRender::new("archive.html", context).title("Archive"),
    ))
}

/// GET /episode/{slug}/{page}
async fn episode_reader(
    State(state): State<AppState>,
    Path((slug, page)): Path<(String, String)>,
) -> Response {
    let path = format!("/episode/{}/{}", slug, page);
    let result = reader_page(&state, &slug, &page).await;
    respond(&state, &path, result).await
}

/// Page segment as a 1-based number; anything else is `None`.
///
/// Integral numerals such as `"2.0"` or `" 2"` count as page 2.
fn parse_page_number(raw: &str) -> Option<u32> {
    let value = raw.trim().parse::<f64>().ok()?;
    if value.fract() != 0.0 || value < 1.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value as u32)
}

async fn reader_page(state: &AppState, slug: &str, raw_page: &str) -> PageResult {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(FrontendError::NotFound);
    }
    let page_number = parse_page_number(raw_page).ok_or(FrontendError::NotFound)? as usize;
    let found = state
        .episode_service
        .find_by_slug(slug)
        .await?
        .ok_or(FrontendError::NotFound)?;
    let page_count = found.pages.len();
    if page_count == 0 {
        return Err(FrontendError::NotFound);
    }
    if page_number > page_count {
        return Ok(Rendered::Redirect(format!(
            "/episode/{}/{}",
            found.episode.slug, page_count
        )));
    }

    let episode = &found.episode;
    let current = &found.pages[page_number - 1];
    let image = state.media_service.find(Some(current.image_id)).await?;
    let next_slug = if page_number == page_count {
        state
            .episode_service
            .next_after(episode.episode_number)
            .await?
            .map(|e| e.slug)
    } else {
        None
    };

    let markdown = MarkdownRenderer::new();
    let mut context = TeraContext::new();
    context.insert("episode_label", &format!("Episode {}", episode.episode_number));
    context.insert("title", &episode.title);
    context.insert("page_label", &format!("Page {} of {}", page_number, page_count));
    context.insert("published", &format_publish_date(&episode.publish_date));
    context.insert(
        "image_url",
        &media_url(image.as_ref()).unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
    );
    context.insert(
        "image_alt",
        &page_alt(current.alt_text.as_deref(), &episode.title, page_number),
    );
    context.insert("page_title", &current.page_title);
    context.insert(
        "caption_html",
        &markdown.render_optional(current.caption.as_deref()),
    );
    context.insert(
        "author_notes_html",
        &markdown.render_optional(episode.author_notes.as_deref()),
    );
    context.insert(
        "nav",
        &reader_nav(&episode.slug, page_number, page_count, next_slug.as_deref()),
    );

    let title = episode
        .seo_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&episode.title)
        .to_string();
    Ok(Rendered::Page(
        PageRender::new("episode.html", context)
            .title(title)
            .description(episode.seo_description.clone())
            .og_image(media_url(image.as_ref())),
    ))
}

// ---- search ----

/// GET /search?q=
async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Response {
    let result = search_page(&state, &query.q).await;
    respond(&state, "/search", result).await
}

async fn search_page(state: &AppState, q: &str) -> PageResult {
    let results = state.search_service.search(q).await?;
    let mut context = TeraContext::new();
    context.insert("query", q.trim());
    context.insert("results", &results);
    Ok(Rendered::Page(
        PageRender::new("search.html", context).title("Search"),
    ))
}

// ---- posts and categories ----

/// GET /posts
async fn posts_index(State(state): State<AppState>) -> Response {
    let result = posts_list_page(&state, 1).await;
    respond(&state, "/posts", result).await
}

/// GET /posts/page/{page}
async fn posts_page(State(state): State<AppState>, Path(page): Path<String>) -> Response {
    let path = format!("/posts/page/{}", page);
    let result = match parse_page_number(&page) {
        Some(page) => posts_list_page(&state, page).await,
        None => Err(FrontendError::NotFound),
    };
    respond(&state, &path, result).await
}

async fn posts_list_page(state: &AppState, page: u32) -> PageResult {
    let result = state.post_service.list_published(page).await?;
    let total_pages = result.total_pages();
    if page > 1 && page > total_pages {
        return Err(FrontendError::NotFound);
    }

    let mut context = TeraContext::new();
    context.insert("range_line", &range_line(&result));
    context.insert("posts", &post_cards(state, &result.items).await?);
    context.insert("pagination", &pagination(page, total_pages));
    let title = if page > 1 {
        format!("Posts Page {}", page)
    } else {
        "Posts".to_string()
    };
    Ok(Rendered::Page(PageRender::new("posts.html", context).title(title)))
}

/// Card image: the SEO image, else the hero image
fn card_image_id(post: &Post) -> Option<i64> {
    post.meta.image_id.or(post.hero_image_id)
}

async fn post_cards(state: &AppState, posts: &[Post]) -> Result<Vec<PostCard>, FrontendError> {
    let ids: Vec<i64> = posts.iter().filter_map(card_image_id).collect();
    let media = state.media_service.get_many(&ids).await?;
    Ok(posts
        .iter()
        .map(|post| {
            let image = card_image_id(post).and_then(|id| media.get(&id));
            PostCard {
                title: post
                    .meta
                    .title
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| post.title.clone()),
                href: post.path(),
                description: post.meta.description.clone(),
                image_url: media_url(image),
                image_alt: image.map(|m| m.alt.clone()).unwrap_or_default(),
            }
        })
        .collect())
}

/// GET /posts/{slug}
async fn post_detail(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let path = format!("/posts/{}", slug);
    let result = post_page(&state, &slug).await;
    respond(&state, &path, result).await
}

async fn post_page(state: &AppState, slug: &str) -> PageResult {
    let post = state
        .post_service
        .find_published(slug)
        .await?
        .ok_or(FrontendError::NotFound)?;
    let categories = state.post_service.categories_of(&post).await?;
    let ids: Vec<i64> = [post.hero_image_id, post.meta.image_id]
        .into_iter()
        .flatten()
        .collect();
    let media = state.media_service.get_many(&ids).await?;
    let hero_image = post.hero_image_id.and_then(|id| media.get(&id));
    let meta_image = post.meta.image_id.and_then(|id| media.get(&id));

    let markdown = MarkdownRenderer::new();
    let hero = HeroView {
        kind: post.impact.as_str(),
        title: Some(post.title.clone()),
        html: None,
        image_url: media_url(hero_image),
        image_alt: hero_image.map(|m| m.alt.clone()).unwrap_or_default(),
        links: Vec::new(),
    };
    let category_links: Vec<NavLink> = categories
        .iter()
        .map(|c| NavLink {
            label: c.title.clone(),
            href: c.path(),
            new_tab: false,
            appearance: Default::default(),
        })
        .collect();

    let mut context = TeraContext::new();
    context.insert("hero", &hero);
    context.insert("content_html", &markdown.render(&post.content));
    context.insert("categories", &category_links);
    context.insert(
        "published",
        &post.published_at.as_ref().map(format_publish_date),
    );

    let title = post
        .meta
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| post.title.clone());
    Ok(Rendered::Page(
        PageRender::new("post.html", context)
            .title(title)
            .description(post.meta.description.clone())
            .font_override(&post.font_override)
            .og_image(media_url(meta_image.or(hero_image))),
    ))
}

/// GET /categories/{slug}
async fn category(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let path = format!("/categories/{}", slug);
    let result = category_page(&state, &slug).await;
    respond(&state, &path, result).await
}

async fn category_page(state: &AppState, slug: &str) -> PageResult {
    let category = state
        .category_service
        .find_by_slug(slug)
        .await?
        .ok_or(FrontendError::NotFound)?;
    let posts = state
        .post_service
        .list_published_by_category(category.id)
        .await?;

    let mut context = TeraContext::new();
    context.insert("heading", &format!("Category: {}", category.title));
    context.insert("posts", &post_cards(state, &posts).await?);
    Ok(Rendered::Page(
        PageRender::new("category.html", context).title(category.title.clone()),
    ))
}

// ---- CMS pages ----

/// GET /{slug}
async fn cms_page(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let path = format!("/{}", slug);
    let result = match state.page_service.find_published(&slug).await {
        Ok(Some(page)) => cms_page_render(&state, page).await,
        Ok(None) => {
            // Single-segment assets such as /favicon.ico land here
            if let Some(response) = static_files::serve_embedded(&slug) {
                return response;
            }
            Err(FrontendError::NotFound)
        }
        Err(e) => Err(e.into()),
    };
    respond(&state, &path, result).await
}

/// Media referenced by a page's hero, blocks and meta
fn page_media_ids(page: &Page) -> Vec<i64> {
    let mut ids: Vec<i64> = [page.hero.media_id, page.meta.image_id]
        .into_iter()
        .flatten()
        .collect();
    for block in &page.layout {
        match block {
            Block::MediaBlock { media_id } => ids.push(*media_id),
            Block::NewsletterSignup(signup) => ids.extend(signup.background_media_id),
            _ => {}
        }
    }
    ids
}

fn render_blocks(
    blocks: &[Block],
    media: &HashMap<i64, Media>,
    markdown: &MarkdownRenderer,
) -> Vec<RenderedBlock> {
    blocks
        .iter()
        .filter_map(|block| match block {
            Block::Content { rich_text } => Some(RenderedBlock::Content {
                html: markdown.render(rich_text),
            }),
            Block::MediaBlock { media_id } => {
                let item = media.get(media_id)?;
                Some(RenderedBlock::Media {
                    url: item.url.clone(),
                    alt: item.alt.clone(),
                    caption_html: markdown.render_optional(item.caption.as_deref()),
                })
            }
            Block::CallToAction { rich_text, links } => Some(RenderedBlock::CallToAction {
                html: markdown.render_optional(rich_text.as_deref()),
                links: NavLink::from_links(links),
            }),
            Block::NewsletterSignup(signup) => {
                let background = signup
                    .background_media_id
                    .and_then(|id| media.get(&id))
                    .map(|m| m.url.clone());
                Some(RenderedBlock::NewsletterSignup(SignupView::new(
                    signup.clone(),
                    background,
                )))
            }
        })
        .collect()
}

async fn cms_page_render(state: &AppState, page: Page) -> PageResult {
    let media = state.media_service.get_many(&page_media_ids(&page)).await?;
    let markdown = MarkdownRenderer::new();
    let hero_image = page.hero.media_id.and_then(|id| media.get(&id));

    let hero = HeroView {
        kind: page.hero.hero_type.as_str(),
        title: None,
        html: markdown.render_optional(page.hero.rich_text.as_deref()),
        image_url: media_url(hero_image),
        image_alt: hero_image.map(|m| m.alt.clone()).unwrap_or_default(),
        links: NavLink::from_links(&page.hero.links),
    };

    let mut context = TeraContext::new();
    context.insert("hero", &hero);
    context.insert("blocks", &render_blocks(&page.layout, &media, &markdown));

    let meta_image = page.meta.image_id.and_then(|id| media.get(&id));
    let title = page
        .meta
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| page.title.clone());
    let render = PageRender::new("page.html", context)
        .description(page.meta.description.clone())
        .font_override(&page.font_override)
        .og_image(media_url(meta_image.or(hero_image)));
    // The home page keeps the bare site title
    let render = if page.slug == crate::models::HOME_SLUG {
        render
    } else {
        render.title(title)
    };
    Ok(Rendered::Page(render))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_media;

    #[test]
    fn test_parse_page_number() {
        assert_eq!(parse_page_number("1"), Some(1));
        assert_eq!(parse_page_number("12"), Some(12));
        assert_eq!(parse_page_number("0"), None);
        assert_eq!(parse_page_number("-1"), None);
        assert_eq!(parse_page_number("two"), None);
        assert_eq!(parse_page_number("1.5"), None);
        assert_eq!(parse_page_number("1.0"), Some(1));
        assert_eq!(parse_page_number(" 2"), Some(2));
        assert_eq!(parse_page_number(""), None);
        assert_eq!(parse_page_number("inf"), None);
        assert_eq!(parse_page_number("NaN"), None);
        assert_eq!(parse_page_number("4294967297"), None);
        assert_eq!(parse_page_number("4294967295"), Some(u32::MAX));
    }

    #[test]
    fn test_render_blocks_skips_missing_media() {
        let markdown = MarkdownRenderer::new();
        let mut media = HashMap::new();
        media.insert(7, sample_media(7, "page-7.png"));

        let blocks = vec![
            Block::Content {
                rich_text: "**Hello**".to_string(),
            },
            Block::MediaBlock { media_id: 7 },
            Block::MediaBlock { media_id: 99 },
            Block::NewsletterSignup(NewsletterSignupBlock::default()),
        ];
        let rendered = render_blocks(&blocks, &media, &markdown);
        assert_eq!(rendered.len(), 3);
        match &rendered[0] {
            RenderedBlock::Content { html } => assert!(html.contains("<strong>Hello</strong>")),
            other => panic!("unexpected block {:?}", other),
        }
        assert!(matches!(rendered[1], RenderedBlock::Media { .. }));
        assert!(matches!(rendered[2], RenderedBlock::NewsletterSignup(_)));
    }
}
