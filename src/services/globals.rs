//! Global documents: site settings, header and footer
//!
//! Reads are cached under the document's `global_{name}` tag; saving a
//! document revalidates that tag. Also holds the small URL and title
//! helpers every rendered page uses.

use crate::cache::Cache;
use crate::db::repositories::{load_global, save_global, GlobalsRepository};
use crate::models::{GlobalDocument, SiteSettings};
use crate::services::media::MediaService;
use crate::services::revalidation::{MutationContext, Revalidator};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const GLOBALS_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum GlobalsServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct GlobalsService {
    repo: Arc<dyn GlobalsRepository>,
    media: Arc<MediaService>,
    cache: Arc<Cache>,
    revalidator: Arc<Revalidator>,
    server_url: String,
}

impl GlobalsService {
    pub fn new(
        repo: Arc<dyn GlobalsRepository>,
        media: Arc<MediaService>,
        cache: Arc<Cache>,
        revalidator: Arc<Revalidator>,
        server_url: &str,
    ) -> Self {
        Self {
            repo,
            media,
            cache,
            revalidator,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    /// Stored document, or its defaults when never saved
    pub async fn get<T: GlobalDocument>(&self) -> Result<T, GlobalsServiceError> {
        let tag = T::cache_tag();
        let repo = self.repo.clone();
        Ok(self
            .cache
            .remember(&[tag.as_str()], "doc", GLOBALS_CACHE_TTL, || async move {
                load_global::<T>(repo.as_ref()).await
            })
            .await?)
    }

    /// Replace a document
    pub async fn update<T: GlobalDocument>(
        &self,
        doc: T,
        ctx: MutationContext,
    ) -> Result<T, GlobalsServiceError> {
        doc.validate().map_err(GlobalsServiceError::ValidationError)?;
        save_global(self.repo.as_ref(), &doc)
            .await
            .with_context(|| format!("Failed to save global {}", T::NAME))?;
        tracing::info!("Updated global {}", T::NAME);

        if !ctx.disable_revalidate {
            self.revalidator.revalidate_tag(&T::cache_tag()).await;
        }
        Ok(doc)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Absolute favicon URL from the site settings, if one is set
    pub async fn favicon_url(
        &self,
        settings: &SiteSettings,
    ) -> Result<Option<String>, GlobalsServiceError> {
        let media = self
            .media
            .find(settings.favicon_id)
            .await
            .map_err(anyhow::Error::new)?;
        Ok(media.and_then(|m| to_absolute_url(&self.server_url, &m.url)))
    }
}

/// `"{page} | {site}"`, or just the site title when the page has none
pub fn build_tab_title(site_title: &str, page_title: Option<&str>) -> String {
    match page_title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(page_title) => format!("{} | {}", page_title, site_title),
        None => site_title.to_string(),
    }
}

/// Prefix `base` unless `url` is already absolute; `None` for blank input
pub fn to_absolute_url(base: &str, url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return Some(url.to_string());
    }
    Some(format!("{}{}", base.trim_end_matches('/'), url))
}

/// Resolve a root-relative `path` against the origin of `base`
pub fn resolve_url(base: &str, path: &str) -> String {
    let origin_end = base
        .find("://")
        .map(|scheme| {
            base[scheme + 3..]
                .find('/')
                .map(|slash| scheme + 3 + slash)
                .unwrap_or(base.len())
        })
        .unwrap_or(base.len());
    let origin = &base[..origin_end];
    if path.starts_with('/') {
        format!("{}{}", origin, path)
    } else {
        format!("{}/{}", origin, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::{CacheConfig, RevalidationConfig, SiteConfig, UploadConfig};
    use crate::db::repositories::media::media_input;
    use crate::db::repositories::{MediaRepository, SqlxGlobalsRepository, SqlxMediaRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Font, Footer, Header, Link};
    use proptest::prelude::*;

    async fn setup() -> (Arc<dyn MediaRepository>, GlobalsService) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let cache = create_cache(&CacheConfig::default()).await.unwrap();
        let revalidator = Arc::new(Revalidator::new(
            cache.clone(),
            &SiteConfig::default(),
            &RevalidationConfig::default(),
        ));
        let media_repo = SqlxMediaRepository::boxed(pool.clone());
        let media = Arc::new(MediaService::new(media_repo.clone(), UploadConfig::default(), None));
        let service = GlobalsService::new(
            SqlxGlobalsRepository::boxed(pool),
            media,
            cache,
            revalidator,
            "https://comic.example.com/",
        );
        (media_repo, service)
    }

    #[test]
    fn test_build_tab_title() {
        assert_eq!(build_tab_title("Hell Versus You", Some("Archive")), "Archive | Hell Versus You");
        assert_eq!(build_tab_title("Hell Versus You", Some("  ")), "Hell Versus You");
        assert_eq!(build_tab_title("Hell Versus You", None), "Hell Versus You");
    }

    #[test]
    fn test_to_absolute_url() {
        let base = "https://comic.example.com";
        assert_eq!(
            to_absolute_url(base, "/uploads/icon.png").as_deref(),
            Some("https://comic.example.com/uploads/icon.png")
        );
        assert_eq!(
            to_absolute_url(base, "https://cdn.example.com/icon.png").as_deref(),
            Some("https://cdn.example.com/icon.png")
        );
        assert_eq!(to_absolute_url(base, ""), None);
    }

    #[test]
    fn test_resolve_url_uses_origin() {
        assert_eq!(
            resolve_url("https://comic.example.com/blog", "/archive"),
            "https://comic.example.com/archive"
        );
        assert_eq!(
            resolve_url("http://localhost:8080", "/episode/a/1"),
            "http://localhost:8080/episode/a/1"
        );
    }

    #[tokio::test]
    async fn test_defaults_then_saved_document() {
        let (_, service) = setup().await;
        let settings = service.get::<SiteSettings>().await.unwrap();
        assert_eq!(settings.title(), "Hell Versus You");
        assert_eq!(settings.default_font, Font::PatrickHand);

        let saved = SiteSettings {
            site_title: "Other Comic".to_string(),
            default_font: Font::Lora,
            ..Default::default()
        };
        service.update(saved, MutationContext::default()).await.unwrap();
        let settings = service.get::<SiteSettings>().await.unwrap();
        assert_eq!(settings.title(), "Other Comic");
        assert_eq!(settings.default_font, Font::Lora);
    }

    #[tokio::test]
    async fn test_nav_item_limit() {
        let (_, service) = setup().await;
        let header = Header {
            nav_items: vec![Link::default(); 7],
            ..Default::default()
        };
        assert!(matches!(
            service.update(header, MutationContext::default()).await,
            Err(GlobalsServiceError::ValidationError(_))
        ));

        let mut footer = Footer::default();
        footer.legal.legal_links = vec![Link::default(); 6];
        assert!(service.update(footer, MutationContext::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_favicon_url_is_absolute() {
        let (media, service) = setup().await;
        let icon = media.create(&media_input("icon.png")).await.unwrap();
        let settings = SiteSettings {
            favicon_id: Some(icon.id),
            ..Default::default()
        };
        assert_eq!(
            service.favicon_url(&settings).await.unwrap().as_deref(),
            Some("https://comic.example.com/uploads/icon.png")
        );
        assert_eq!(service.favicon_url(&SiteSettings::default()).await.unwrap(), None);
    }

    proptest! {
        #[test]
        fn absolute_urls_are_left_alone(path in "[a-z0-9/._-]{0,30}") {
            let url = format!("https://cdn.example.com/{}", path);
            prop_assert_eq!(to_absolute_url("https://comic.example.com", &url), Some(url.clone()));
        }
    }
}
