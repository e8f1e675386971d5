//! Episode service
//!
//! Business logic for episodes:
//! - Create, update, delete with slug and number uniqueness
//! - Pages replaced as a whole, at least one per episode
//! - Cached frontend fetchers for the latest episode and the archive
//! - Revalidation of the episode tags plus the peer call after every write

use crate::cache::Cache;
use crate::db::repositories::{ChapterRepository, EpisodeRepository};
use crate::models::{
    CreateEpisodeInput, Episode, EpisodePageInput, EpisodeSort, EpisodeWithPages, ListParams,
    Media, PagedResult, UpdateEpisodeInput,
};
use crate::services::media::{MediaService, MediaServiceError};
use crate::services::revalidation::{tags, MutationContext, Revalidator};
use crate::services::slug::slug_or_generate;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Archive entries are cached for a minute on top of tag revalidation
const ARCHIVE_CACHE_TTL: Duration = Duration::from_secs(60);
const LATEST_CACHE_TTL: Duration = Duration::from_secs(3600);
const ARCHIVE_LIMIT: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum EpisodeServiceError {
    #[error("Episode not found: {0}")]
    NotFound(String),

    #[error("Episode slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Episode number already exists: {0}")]
    DuplicateNumber(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<MediaServiceError> for EpisodeServiceError {
    fn from(err: MediaServiceError) -> Self {
        EpisodeServiceError::InternalError(anyhow::Error::new(err))
    }
}

/// Episode summary shown on the archive grid and the home page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeCard {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub episode_number: i64,
    pub publish_date: DateTime<Utc>,
    pub thumbnail_url: String,
    pub thumbnail_alt: String,
}

impl EpisodeCard {
    pub fn reader_path(&self) -> String {
        format!("/episode/{}/1", self.slug)
    }
}

pub struct EpisodeService {
    repo: Arc<dyn EpisodeRepository>,
    chapter_repo: Arc<dyn ChapterRepository>,
    media: Arc<MediaService>,
    cache: Arc<Cache>,
    revalidator: Arc<Revalidator>,
}

impl EpisodeService {
    pub fn new(
        repo: Arc<dyn EpisodeRepository>,
        chapter_repo: Arc<dyn ChapterRepository>,
        media: Arc<MediaService>,
        cache: Arc<Cache>,
        revalidator: Arc<Revalidator>,
    ) -> Self {
        Self {
            repo,
            chapter_repo,
            media,
            cache,
            revalidator,
        }
    }

    pub async fn create(
        &self,
        input: CreateEpisodeInput,
        ctx: MutationContext,
    ) -> Result<EpisodeWithPages, EpisodeServiceError> {
        let title = required_title(&input.title)?;
        let slug = slug_or_generate(input.slug.as_deref(), &title);
        if slug.is_empty() {
            return Err(EpisodeServiceError::ValidationError(
                "Slug cannot be empty".to_string(),
            ));
        }
        self.validate_pages(&input.pages).await?;
        self.ensure_unique(&slug, input.episode_number, None).await?;
        if let Some(chapter_id) = input.chapter_id {
            self.ensure_chapter_exists(chapter_id).await?;
        }

        let now = Utc::now();
        let episode = Episode {
            id: 0,
            seo_title: seo_title_or_default(input.seo_title, &title),
            title,
            slug,
            episode_number: input.episode_number,
            chapter_id: input.chapter_id,
            publish_date: input.publish_date,
            thumbnail_id: input.thumbnail_id,
            author_notes: non_blank(input.author_notes),
            seo_description: non_blank(input.seo_description),
            created_at: now,
            updated_at: now,
        };

        let created = self
            .repo
            .create(&episode, &input.pages)
            .await
            .context("Failed to create episode")?;
        tracing::info!(
            "Created episode {} ({} pages)",
            created.episode.episode_number,
            created.page_count()
        );

        self.after_change(ctx).await;
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<EpisodeWithPages, EpisodeServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get episode")?
            .ok_or_else(|| EpisodeServiceError::NotFound(id.to_string()))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<EpisodeWithPages, EpisodeServiceError> {
        self.find_by_slug(slug)
            .await?
            .ok_or_else(|| EpisodeServiceError::NotFound(slug.to_string()))
    }

    /// Reader lookup, `None` for blank or unknown slugs
    pub async fn find_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<EpisodeWithPages>, EpisodeServiceError> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Ok(None);
        }
        Ok(self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get episode by slug")?)
    }

    pub async fn list(
        &self,
        sort: EpisodeSort,
        params: &ListParams,
    ) -> Result<PagedResult<Episode>, EpisodeServiceError> {
        Ok(self
            .repo
            .list(sort, params)
            .await
            .context("Failed to list episodes")?)
    }

    /// Highest-numbered episode, uncached
    pub async fn latest(&self) -> Result<Option<EpisodeWithPages>, EpisodeServiceError> {
        Ok(self.repo.latest().await.context("Failed to get latest episode")?)
    }

    /// Episode following `episode_number` in reading order
    pub async fn next_after(&self, episode_number: i64) -> Result<Option<Episode>, EpisodeServiceError> {
        Ok(self
            .repo
            .next_after(episode_number)
            .await
            .context("Failed to get next episode")?)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateEpisodeInput,
        ctx: MutationContext,
    ) -> Result<EpisodeWithPages, EpisodeServiceError> {
        let mut episode = self.get(id).await?.episode;

        if let Some(title) = input.title {
            episode.title = required_title(&title)?;
        }
        if let Some(slug) = input.slug {
            let slug = slug_or_generate(Some(&slug), &episode.title);
            if slug.is_empty() {
                return Err(EpisodeServiceError::ValidationError(
                    "Slug cannot be empty".to_string(),
                ));
            }
            episode.slug = slug;
        }
        if let Some(number) = input.episode_number {
            episode.episode_number = number;
        }
        self.ensure_unique(&episode.slug, episode.episode_number, Some(id))
            .await?;

        if let Some(chapter_id) = input.chapter_id {
            if let Some(chapter_id) = chapter_id {
                self.ensure_chapter_exists(chapter_id).await?;
            }
            episode.chapter_id = chapter_id;
        }
        if let Some(publish_date) = input.publish_date {
            episode.publish_date = publish_date;
        }
        if let Some(thumbnail_id) = input.thumbnail_id {
            episode.thumbnail_id = thumbnail_id;
        }
        if let Some(notes) = input.author_notes {
            episode.author_notes = non_blank(notes);
        }
        if let Some(seo_title) = input.seo_title {
            episode.seo_title = seo_title;
        }
        episode.seo_title = seo_title_or_default(episode.seo_title.take(), &episode.title);
        if let Some(description) = input.seo_description {
            episode.seo_description = non_blank(description);
        }

        if let Some(pages) = &input.pages {
            self.validate_pages(pages).await?;
        }

        let updated = self
            .repo
            .update(&episode, input.pages.as_deref())
            .await
            .context("Failed to update episode")?;

        self.after_change(ctx).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, ctx: MutationContext) -> Result<(), EpisodeServiceError> {
        let episode = self.get(id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete episode")?;
        tracing::info!("Deleted episode {}", episode.episode.episode_number);

        self.after_change(ctx).await;
        Ok(())
    }

    /// Latest episode card for the home page, cached under both episode tags
    pub async fn cached_latest(&self) -> Result<Option<EpisodeCard>, EpisodeServiceError> {
        let cards = self
            .cache
            .remember(
                &tags::EPISODE_TAGS,
                "latest",
                LATEST_CACHE_TTL,
                || async {
                    let latest = self.repo.latest().await.context("Failed to get latest episode")?;
                    let episodes: Vec<Episode> = latest.into_iter().map(|e| e.episode).collect();
                    self.build_cards(episodes).await
                },
            )
            .await?;
        Ok(cards.into_iter().next())
    }

    /// Archive cards, newest first, at most 100.
    ///
    /// Episodes without a slug or title are left out.
    pub async fn cached_archive(&self) -> Result<Vec<EpisodeCard>, EpisodeServiceError> {
        Ok(self
            .cache
            .remember(
                &[tags::COLLECTION_EPISODES],
                "episodes_archive",
                ARCHIVE_CACHE_TTL,
                || async {
                    let episodes = self
                        .repo
                        .list(EpisodeSort::NumberDesc, &ListParams::new(1, ARCHIVE_LIMIT))
                        .await
                        .context("Failed to list archive episodes")?
                        .items
                        .into_iter()
                        .filter(|e| !e.slug.trim().is_empty() && !e.title.trim().is_empty())
                        .collect();
                    self.build_cards(episodes).await
                },
            )
            .await?)
    }

    /// Resolve thumbnails: the episode thumbnail, else the first page image
    async fn build_cards(&self, episodes: Vec<Episode>) -> anyhow::Result<Vec<EpisodeCard>> {
        let missing: Vec<i64> = episodes
            .iter()
            .filter(|e| e.thumbnail_id.is_none())
            .map(|e| e.id)
            .collect();
        let first_pages = self
            .repo
            .first_page_images(&missing)
            .await
            .context("Failed to load first pages")?;

        let sources: HashMap<i64, i64> = episodes
            .iter()
            .filter_map(|e| {
                e.thumbnail_id
                    .or_else(|| first_pages.get(&e.id).copied())
                    .map(|media_id| (e.id, media_id))
            })
            .collect();
        let media_ids: Vec<i64> = sources.values().copied().collect();
        let media: HashMap<i64, Media> = self
            .media
            .get_many(&media_ids)
            .await
            .map_err(anyhow::Error::new)?;

        Ok(episodes
            .into_iter()
            .map(|episode| {
                let image = sources.get(&episode.id).and_then(|id| media.get(id));
                EpisodeCard {
                    thumbnail_url: self.media.archive_thumbnail_url(image),
                    thumbnail_alt: image
                        .map(|m| m.alt.clone())
                        .unwrap_or_else(|| format!("{} thumbnail", episode.title)),
                    id: episode.id,
                    title: episode.title,
                    slug: episode.slug,
                    episode_number: episode.episode_number,
                    publish_date: episode.publish_date,
                }
            })
            .collect())
    }

    async fn after_change(&self, ctx: MutationContext) {
        if ctx.disable_revalidate {
            return;
        }
        self.revalidator.revalidate_episode_tags().await;
        self.revalidator.trigger_episode_revalidation();
    }

    async fn validate_pages(&self, pages: &[EpisodePageInput]) -> Result<(), EpisodeServiceError> {
        if pages.is_empty() {
            return Err(EpisodeServiceError::ValidationError(
                "An episode needs at least one page".to_string(),
            ));
        }
        let ids: Vec<i64> = pages.iter().map(|p| p.image_id).collect();
        let found = self.media.get_many(&ids).await?;
        if let Some((position, page)) = pages
            .iter()
            .enumerate()
            .find(|(_, page)| !found.contains_key(&page.image_id))
        {
            return Err(EpisodeServiceError::ValidationError(format!(
                "Page {} references missing media {}",
                position + 1,
                page.image_id
            )));
        }
        Ok(())
    }

    async fn ensure_unique(
        &self,
        slug: &str,
        number: i64,
        own_id: Option<i64>,
    ) -> Result<(), EpisodeServiceError> {
        if let Some(other) = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            if Some(other.episode.id) != own_id {
                return Err(EpisodeServiceError::DuplicateSlug(slug.to_string()));
            }
        }
        if let Some(other) = self
            .repo
            .get_by_number(number)
            .await
            .context("Failed to check episode number")?
        {
            if Some(other.id) != own_id {
                return Err(EpisodeServiceError::DuplicateNumber(number));
            }
        }
        Ok(())
    }

    async fn ensure_chapter_exists(&self, chapter_id: i64) -> Result<(), EpisodeServiceError> {
        match self
            .chapter_repo
            .get_by_id(chapter_id)
            .await
            .context("Failed to get chapter")?
        {
            Some(_) => Ok(()),
            None => Err(EpisodeServiceError::ValidationError(format!(
                "Chapter not found: {}",
                chapter_id
            ))),
        }
    }
}

fn required_title(title: &str) -> Result<String, EpisodeServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(EpisodeServiceError::ValidationError(
            "Title is required".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn seo_title_or_default(seo_title: Option<String>, title: &str) -> Option<String> {
    Some(non_blank(seo_title).unwrap_or_else(|| title.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{create_cache, tagged_key, CacheLayer};
    use crate::config::{CacheConfig, RevalidationConfig, SiteConfig, UploadConfig};
    use crate::db::repositories::media::media_input;
    use crate::db::repositories::{SqlxChapterRepository, SqlxEpisodeRepository, SqlxMediaRepository};
    use crate::db::{create_test_pool, migrations};

    struct Fixture {
        cache: Arc<Cache>,
        service: EpisodeService,
        images: Vec<i64>,
    }

    async fn fixture() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let media_repo = SqlxMediaRepository::boxed(pool.clone());
        let mut images = Vec::new();
        for name in ["p1.png", "p2.png", "cover.png"] {
            images.push(media_repo.create(&media_input(name)).await.unwrap().id);
        }

        let cache = create_cache(&CacheConfig::default()).await.unwrap();
        let revalidator = Arc::new(Revalidator::new(
            cache.clone(),
            &SiteConfig::default(),
            &RevalidationConfig::default(),
        ));
        let media = Arc::new(MediaService::new(media_repo, UploadConfig::default(), None));
        let service = EpisodeService::new(
            SqlxEpisodeRepository::boxed(pool.clone()),
            SqlxChapterRepository::boxed(pool),
            media,
            cache.clone(),
            revalidator,
        );
        Fixture {
            cache,
            service,
            images,
        }
    }

    fn page(image_id: i64) -> EpisodePageInput {
        EpisodePageInput {
            image_id,
            alt_text: None,
            page_title: None,
            caption: None,
        }
    }

    fn input(title: &str, number: i64, pages: Vec<EpisodePageInput>) -> CreateEpisodeInput {
        CreateEpisodeInput {
            title: title.to_string(),
            slug: None,
            episode_number: number,
            chapter_id: None,
            publish_date: Utc::now(),
            thumbnail_id: None,
            author_notes: None,
            seo_title: None,
            seo_description: None,
            pages,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_slug_and_seo_title() {
        let f = fixture().await;
        let created = f
            .service
            .create(
                input("The Awakening", 1, vec![page(f.images[0]), page(f.images[1])]),
                MutationContext::quiet(),
            )
            .await
            .unwrap();
        assert_eq!(created.episode.slug, "the-awakening");
        assert_eq!(created.episode.seo_title.as_deref(), Some("The Awakening"));
        assert_eq!(created.page_count(), 2);
    }

    #[tokio::test]
    async fn test_episode_needs_pages() {
        let f = fixture().await;
        let err = f
            .service
            .create(input("Empty", 1, vec![]), MutationContext::quiet())
            .await;
        assert!(matches!(err, Err(EpisodeServiceError::ValidationError(_))));

        let err = f
            .service
            .create(input("Broken", 1, vec![page(9999)]), MutationContext::quiet())
            .await;
        assert!(matches!(err, Err(EpisodeServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_number_and_slug_are_unique() {
        let f = fixture().await;
        f.service
            .create(input("One", 1, vec![page(f.images[0])]), MutationContext::quiet())
            .await
            .unwrap();

        let same_number = f
            .service
            .create(input("Other", 1, vec![page(f.images[0])]), MutationContext::quiet())
            .await;
        assert!(matches!(same_number, Err(EpisodeServiceError::DuplicateNumber(1))));

        let same_slug = f
            .service
            .create(input("One", 2, vec![page(f.images[0])]), MutationContext::quiet())
            .await;
        assert!(matches!(same_slug, Err(EpisodeServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_pages_unless_given() {
        let f = fixture().await;
        let created = f
            .service
            .create(
                input("One", 1, vec![page(f.images[0]), page(f.images[1])]),
                MutationContext::quiet(),
            )
            .await
            .unwrap();

        let renamed = f
            .service
            .update(
                created.episode.id,
                UpdateEpisodeInput {
                    title: Some("One Again".to_string()),
                    seo_title: Some(None),
                    ..Default::default()
                },
                MutationContext::quiet(),
            )
            .await
            .unwrap();
        assert_eq!(renamed.page_count(), 2);
        assert_eq!(renamed.episode.seo_title.as_deref(), Some("One Again"));

        let empty = f
            .service
            .update(
                created.episode.id,
                UpdateEpisodeInput {
                    pages: Some(vec![]),
                    ..Default::default()
                },
                MutationContext::quiet(),
            )
            .await;
        assert!(matches!(empty, Err(EpisodeServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_next_after_follows_number_order() {
        let f = fixture().await;
        for number in [3, 1, 2] {
            f.service
                .create(
                    input(&format!("Ep {}", number), number, vec![page(f.images[0])]),
                    MutationContext::quiet(),
                )
                .await
                .unwrap();
        }
        assert_eq!(f.service.next_after(1).await.unwrap().unwrap().episode_number, 2);
        assert!(f.service.next_after(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_archive_thumbnails_and_order() {
        let f = fixture().await;
        f.service
            .create(input("First", 1, vec![page(f.images[0])]), MutationContext::quiet())
            .await
            .unwrap();
        let mut second = input("Second", 2, vec![page(f.images[1])]);
        second.thumbnail_id = Some(f.images[2]);
        f.service.create(second, MutationContext::quiet()).await.unwrap();

        let cards = f.service.cached_archive().await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].episode_number, 2);
        assert_eq!(cards[0].thumbnail_url, "/uploads/cover.png");
        assert_eq!(cards[1].thumbnail_url, "/uploads/p1.png");
        assert_eq!(cards[1].reader_path(), "/episode/first/1");
    }

    #[tokio::test]
    async fn test_writes_revalidate_cached_fetchers() {
        let f = fixture().await;
        f.service
            .create(input("First", 1, vec![page(f.images[0])]), MutationContext::quiet())
            .await
            .unwrap();
        assert_eq!(f.service.cached_latest().await.unwrap().unwrap().episode_number, 1);

        // Quiet writes leave the cached latest episode alone
        f.service
            .create(input("Second", 2, vec![page(f.images[0])]), MutationContext::quiet())
            .await
            .unwrap();
        assert_eq!(f.service.cached_latest().await.unwrap().unwrap().episode_number, 1);

        f.service
            .create(input("Third", 3, vec![page(f.images[0])]), MutationContext::default())
            .await
            .unwrap();
        assert_eq!(f.service.cached_latest().await.unwrap().unwrap().episode_number, 3);
        let key = tagged_key(&tags::EPISODE_TAGS, "latest");
        assert!(f.cache.get::<Vec<EpisodeCard>>(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_rejects_slug_without_letters() {
        let f = fixture().await;
        let created = f
            .service
            .create(input("One", 1, vec![page(f.images[0])]), MutationContext::quiet())
            .await
            .unwrap();

        let result = f
            .service
            .update(
                created.episode.id,
                UpdateEpisodeInput {
                    slug: Some("???".to_string()),
                    ..Default::default()
                },
                MutationContext::quiet(),
            )
            .await;
        assert!(matches!(result, Err(EpisodeServiceError::ValidationError(_))));
        assert_eq!(f.service.get(created.episode.id).await.unwrap().episode.slug, "one");
    }
}
