//! Page service
//!
//! Free-form pages with a hero and layout blocks. Versioned like posts.
//! Published pages revalidate their path (`/` for the home page) and the
//! pages sitemap.

use crate::db::repositories::PageRepository;
use crate::models::{
    CreatePageInput, Hero, ListParams, Page, PagedResult, PageVersion, PublishStatus,
    UpdatePageInput, HOME_SLUG, MAX_HERO_LINKS,
};
use crate::services::revalidation::{tags, MutationContext, Revalidator};
use crate::services::slug::slug_or_generate;
use crate::services::validation::normalize_font_override;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PageServiceError {
    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("Page version not found: {0}")]
    VersionNotFound(i64),

    #[error("Page slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PageService {
    repo: Arc<dyn PageRepository>,
    revalidator: Arc<Revalidator>,
}

impl PageService {
    pub fn new(repo: Arc<dyn PageRepository>, revalidator: Arc<Revalidator>) -> Self {
        Self { repo, revalidator }
    }

    pub async fn create(
        &self,
        input: CreatePageInput,
        ctx: MutationContext,
    ) -> Result<Page, PageServiceError> {
        let title = required_title(&input.title)?;
        let slug = slug_or_generate(input.slug.as_deref(), &title);
        if slug.is_empty() {
            return Err(PageServiceError::ValidationError(
                "Slug cannot be empty".to_string(),
            ));
        }
        self.ensure_slug_free(&slug, None).await?;
        validate_hero(&input.hero)?;
        let font_override = normalize_font_override(input.font_override.as_deref())
            .map_err(PageServiceError::ValidationError)?;

        let now = Utc::now();
        let mut page = Page {
            id: 0,
            title,
            slug,
            status: input.status,
            published_at: input.published_at,
            hero: input.hero,
            layout: input.layout,
            meta: input.meta,
            font_override,
            created_at: now,
            updated_at: now,
        };
        stamp_published_at(&mut page);

        let created = self.repo.create(&page).await.context("Failed to create page")?;
        if !ctx.disable_revalidate {
            self.revalidate_change(&created, None).await;
        }
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Page, PageServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get page")?
            .ok_or_else(|| PageServiceError::NotFound(id.to_string()))
    }

    /// Published page for the public site; drafts are `None`
    pub async fn find_published(&self, slug: &str) -> Result<Option<Page>, PageServiceError> {
        let page = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get page by slug")?;
        Ok(page.filter(Page::is_published))
    }

    /// The published `home` page, when one exists
    pub async fn home(&self) -> Result<Option<Page>, PageServiceError> {
        self.find_published(HOME_SLUG).await
    }

    pub async fn list(
        &self,
        status: Option<PublishStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Page>, PageServiceError> {
        Ok(self
            .repo
            .list(status, params)
            .await
            .context("Failed to list pages")?)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdatePageInput,
        ctx: MutationContext,
    ) -> Result<Page, PageServiceError> {
        let previous = self.get(id).await?;
        let mut page = previous.clone();

        if let Some(title) = input.title {
            page.title = required_title(&title)?;
        }
        if let Some(slug) = input.slug {
            let slug = slug_or_generate(Some(&slug), &page.title);
            if slug.is_empty() {
                return Err(PageServiceError::ValidationError(
                    "Slug cannot be empty".to_string(),
                ));
            }
            if slug != previous.slug {
                self.ensure_slug_free(&slug, Some(id)).await?;
            }
            page.slug = slug;
        }
        if let Some(status) = input.status {
            page.status = status;
        }
        if let Some(published_at) = input.published_at {
            page.published_at = published_at;
        }
        if let Some(hero) = input.hero {
            validate_hero(&hero)?;
            page.hero = hero;
        }
        if let Some(layout) = input.layout {
            page.layout = layout;
        }
        if let Some(meta) = input.meta {
            page.meta = meta;
        }
        if let Some(font_override) = input.font_override {
            page.font_override = normalize_font_override(Some(&font_override))
                .map_err(PageServiceError::ValidationError)?;
        }
        stamp_published_at(&mut page);

        self.save_revision(previous, page, ctx).await
    }

    pub async fn delete(&self, id: i64, ctx: MutationContext) -> Result<(), PageServiceError> {
        let page = self.get(id).await?;
        self.repo.delete(id).await.context("Failed to delete page")?;
        if !ctx.disable_revalidate {
            self.revalidator.revalidate_path(&page.path()).await;
        }
        Ok(())
    }

    pub async fn list_versions(&self, id: i64) -> Result<Vec<PageVersion>, PageServiceError> {
        self.get(id).await?;
        Ok(self
            .repo
            .list_versions(id)
            .await
            .context("Failed to list page versions")?)
    }

    /// Bring back an earlier revision. The current one becomes a version too.
    pub async fn restore_version(
        &self,
        id: i64,
        version_id: i64,
        ctx: MutationContext,
    ) -> Result<Page, PageServiceError> {
        let previous = self.get(id).await?;
        let version = self
            .repo
            .get_version(version_id)
            .await
            .context("Failed to get page version")?
            .filter(|v| v.page_id == id)
            .ok_or(PageServiceError::VersionNotFound(version_id))?;

        if version.snapshot.slug != previous.slug {
            self.ensure_slug_free(&version.snapshot.slug, Some(id)).await?;
        }
        let restored = Page {
            id,
            created_at: previous.created_at,
            ..version.snapshot
        };
        self.save_revision(previous, restored, ctx).await
    }

    async fn save_revision(
        &self,
        previous: Page,
        page: Page,
        ctx: MutationContext,
    ) -> Result<Page, PageServiceError> {
        self.repo
            .save_version(&previous)
            .await
            .context("Failed to save page version")?;
        let updated = self.repo.update(&page).await.context("Failed to update page")?;

        if !ctx.disable_revalidate {
            self.revalidate_change(&updated, Some(&previous)).await;
        }
        Ok(updated)
    }

    async fn revalidate_change(&self, page: &Page, previous: Option<&Page>) {
        if page.is_published() {
            self.revalidator.revalidate_path(&page.path()).await;
            self.revalidator.revalidate_tag(tags::PAGES_SITEMAP).await;
        }
        if let Some(previous) = previous.filter(|p| p.is_published()) {
            if !page.is_published() || previous.slug != page.slug {
                self.revalidator.revalidate_path(&previous.path()).await;
                self.revalidator.revalidate_tag(tags::PAGES_SITEMAP).await;
            }
        }
    }

    async fn ensure_slug_free(&self, slug: &str, own_id: Option<i64>) -> Result<(), PageServiceError> {
        match self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            Some(other) if Some(other.id) != own_id => {
                Err(PageServiceError::DuplicateSlug(slug.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn validate_hero(hero: &Hero) -> Result<(), PageServiceError> {
    if hero.hero_type.requires_media() && hero.media_id.is_none() {
        return Err(PageServiceError::ValidationError(
            "Hero media is required for high and medium impact heroes".to_string(),
        ));
    }
    if hero.links.len() > MAX_HERO_LINKS {
        return Err(PageServiceError::ValidationError(format!(
            "A hero can have at most {} links",
            MAX_HERO_LINKS
        )));
    }
    Ok(())
}

fn stamp_published_at(page: &mut Page) {
    if page.is_published() && page.published_at.is_none() {
        page.published_at = Some(Utc::now());
    }
}

fn required_title(title: &str) -> Result<String, PageServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PageServiceError::ValidationError("Title is required".to_string()));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{create_cache, tagged_key, Cache, CacheLayer};
    use crate::config::{CacheConfig, RevalidationConfig, SiteConfig};
    use crate::db::repositories::SqlxPageRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Block, Impact};
    use crate::services::revalidation::path_tag;
    use std::time::Duration;

    async fn setup() -> (Arc<Cache>, PageService) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let cache = create_cache(&CacheConfig::default()).await.unwrap();
        let revalidator = Arc::new(Revalidator::new(
            cache.clone(),
            &SiteConfig::default(),
            &RevalidationConfig::default(),
        ));
        (cache.clone(), PageService::new(SqlxPageRepository::boxed(pool), revalidator))
    }

    fn input(title: &str, status: PublishStatus) -> CreatePageInput {
        CreatePageInput {
            title: title.to_string(),
            slug: None,
            status,
            published_at: None,
            hero: Hero::default(),
            layout: vec![Block::Content {
                rich_text: "Welcome".to_string(),
            }],
            meta: Default::default(),
            font_override: None,
        }
    }

    #[tokio::test]
    async fn test_hero_rules() {
        let (_, service) = setup().await;
        let mut high = input("About", PublishStatus::Draft);
        high.hero.hero_type = Impact::HighImpact;
        assert!(matches!(
            service.create(high, MutationContext::quiet()).await,
            Err(PageServiceError::ValidationError(_))
        ));

        let mut too_many = input("About", PublishStatus::Draft);
        too_many.hero.links = vec![Default::default(); 3];
        assert!(matches!(
            service.create(too_many, MutationContext::quiet()).await,
            Err(PageServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_home_page_lookup() {
        let (_, service) = setup().await;
        assert!(service.home().await.unwrap().is_none());

        let mut home = input("Home", PublishStatus::Draft);
        home.slug = Some("home".to_string());
        let page = service.create(home, MutationContext::quiet()).await.unwrap();
        assert!(service.home().await.unwrap().is_none());

        service
            .update(
                page.id,
                UpdatePageInput {
                    status: Some(PublishStatus::Published),
                    ..Default::default()
                },
                MutationContext::quiet(),
            )
            .await
            .unwrap();
        let home = service.home().await.unwrap().unwrap();
        assert_eq!(home.path(), "/");
        assert!(home.published_at.is_some());
    }

    #[tokio::test]
    async fn test_publish_revalidates_path_and_sitemap() {
        let (cache, service) = setup().await;
        let page = service
            .create(input("About", PublishStatus::Published), MutationContext::quiet())
            .await
            .unwrap();

        let ttl = Duration::from_secs(60);
        let path_key = tagged_key(&[path_tag("/about").as_str()], "html");
        let sitemap_key = tagged_key(&[tags::PAGES_SITEMAP], "sitemap");
        cache.set(&path_key, &1_i64, ttl).await.unwrap();
        cache.set(&sitemap_key, &1_i64, ttl).await.unwrap();

        service
            .update(
                page.id,
                UpdatePageInput {
                    slug: Some("about-us".to_string()),
                    ..Default::default()
                },
                MutationContext::default(),
            )
            .await
            .unwrap();
        assert!(cache.get::<i64>(&path_key).await.unwrap().is_none());
        assert!(cache.get::<i64>(&sitemap_key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_versions_and_restore() {
        let (_, service) = setup().await;
        let page = service
            .create(input("Contact", PublishStatus::Draft), MutationContext::quiet())
            .await
            .unwrap();
        service
            .update(
                page.id,
                UpdatePageInput {
                    layout: Some(vec![]),
                    ..Default::default()
                },
                MutationContext::quiet(),
            )
            .await
            .unwrap();

        let versions = service.list_versions(page.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        let restored = service
            .restore_version(page.id, versions[0].id, MutationContext::quiet())
            .await
            .unwrap();
        assert_eq!(restored.layout.len(), 1);
        assert!(matches!(
            service.restore_version(page.id, 9999, MutationContext::quiet()).await,
            Err(PageServiceError::VersionNotFound(9999))
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_slug_without_letters() {
        let (_, service) = setup().await;
        let page = service
            .create(input("About", PublishStatus::Draft), MutationContext::quiet())
            .await
            .unwrap();
        let result = service
            .update(
                page.id,
                UpdatePageInput {
                    slug: Some("///".to_string()),
                    ..Default::default()
                },
                MutationContext::quiet(),
            )
            .await;
        assert!(matches!(result, Err(PageServiceError::ValidationError(_))));
    }
}
