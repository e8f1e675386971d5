//! Post service
//!
//! Implements the post lifecycle:
//! - Create, update, delete with draft/publish status
//! - Snapshot of the previous revision on every update, and restore
//! - Public listings of published posts, overall and per category
//! - Path, sitemap and category revalidation after every write

use crate::db::repositories::{CategoryRepository, PostRepository};
use crate::models::{
    Category, CreatePostInput, ListParams, PagedResult, Post, PostVersion, PublishStatus,
    UpdatePostInput,
};
use crate::services::revalidation::{tags, MutationContext, Revalidator};
use crate::services::slug::slug_or_generate;
use crate::services::validation::normalize_font_override;
use anyhow::Context;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Posts per page on `/posts`
pub const POSTS_PER_PAGE: u32 = 12;

/// Posts listed on a category page
pub const CATEGORY_POST_LIMIT: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("Post version not found: {0}")]
    VersionNotFound(i64),

    #[error("Post slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    revalidator: Arc<Revalidator>,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        revalidator: Arc<Revalidator>,
    ) -> Self {
        Self {
            repo,
            category_repo,
            revalidator,
        }
    }

    pub async fn create(
        &self,
        input: CreatePostInput,
        ctx: MutationContext,
    ) -> Result<Post, PostServiceError> {
        let title = required_title(&input.title)?;
        let slug = slug_or_generate(input.slug.as_deref(), &title);
        if slug.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Slug cannot be empty".to_string(),
            ));
        }
        self.ensure_slug_free(&slug, None).await?;
        let category_ids = self.checked_categories(input.category_ids).await?;
        let font_override = normalize_font_override(input.font_override.as_deref())
            .map_err(PostServiceError::ValidationError)?;

        let now = Utc::now();
        let mut post = Post {
            id: 0,
            title,
            slug,
            content: input.content,
            hero_image_id: input.hero_image_id,
            status: input.status,
            published_at: input.published_at,
            meta: input.meta,
            impact: input.impact,
            font_override,
            category_ids,
            created_at: now,
            updated_at: now,
        };
        stamp_published_at(&mut post);

        let created = self.repo.create(&post).await.context("Failed to create post")?;
        if !ctx.disable_revalidate {
            self.revalidate_change(&created, None).await;
        }
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(id.to_string()))
    }

    /// Published post for the public site; drafts are `None`
    pub async fn find_published(&self, slug: &str) -> Result<Option<Post>, PostServiceError> {
        let post = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")?;
        Ok(post.filter(Post::is_published))
    }

    /// Admin listing across all statuses
    pub async fn list(
        &self,
        status: Option<PublishStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        Ok(self
            .repo
            .list(status, params)
            .await
            .context("Failed to list posts")?)
    }

    /// One page of `/posts`, 12 per page
    pub async fn list_published(&self, page: u32) -> Result<PagedResult<Post>, PostServiceError> {
        self.list(
            Some(PublishStatus::Published),
            &ListParams::new(page, POSTS_PER_PAGE),
        )
        .await
    }

    /// Published posts filed under a category, newest first
    pub async fn list_published_by_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<Post>, PostServiceError> {
        Ok(self
            .repo
            .list_by_category(category_id, &ListParams::new(1, CATEGORY_POST_LIMIT))
            .await
            .context("Failed to list posts by category")?
            .items)
    }

    pub async fn categories_of(&self, post: &Post) -> Result<Vec<Category>, PostServiceError> {
        Ok(self
            .category_repo
            .get_many(&post.category_ids)
            .await
            .context("Failed to load post categories")?)
    }

    /// Update a post, keeping a snapshot of the previous revision
    pub async fn update(
        &self,
        id: i64,
        input: UpdatePostInput,
        ctx: MutationContext,
    ) -> Result<Post, PostServiceError> {
        let previous = self.get(id).await?;
        let mut post = previous.clone();

        if let Some(title) = input.title {
            post.title = required_title(&title)?;
        }
        if let Some(slug) = input.slug {
            let slug = slug_or_generate(Some(&slug), &post.title);
            if slug.is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Slug cannot be empty".to_string(),
                ));
            }
            if slug != previous.slug {
                self.ensure_slug_free(&slug, Some(id)).await?;
            }
            post.slug = slug;
        }
        if let Some(content) = input.content {
            post.content = content;
        }
        if let Some(hero_image_id) = input.hero_image_id {
            post.hero_image_id = hero_image_id;
        }
        if let Some(status) = input.status {
            post.status = status;
        }
        if let Some(published_at) = input.published_at {
            post.published_at = published_at;
        }
        if let Some(category_ids) = input.category_ids {
            post.category_ids = self.checked_categories(category_ids).await?;
        }
        if let Some(meta) = input.meta {
            post.meta = meta;
        }
        if let Some(impact) = input.impact {
            post.impact = impact;
        }
        if let Some(font_override) = input.font_override {
            post.font_override = normalize_font_override(Some(&font_override))
                .map_err(PostServiceError::ValidationError)?;
        }
        stamp_published_at(&mut post);

        self.save_revision(previous, post, ctx).await
    }

    pub async fn delete(&self, id: i64, ctx: MutationContext) -> Result<(), PostServiceError> {
        let post = self.get(id).await?;
        self.repo.delete(id).await.context("Failed to delete post")?;

        if !ctx.disable_revalidate {
            self.revalidator.revalidate_path(&post.path()).await;
            self.revalidator.revalidate_tag(tags::POSTS_SITEMAP).await;
            self.revalidate_categories(post.category_ids.iter().copied().collect())
                .await;
        }
        Ok(())
    }

    pub async fn list_versions(&self, id: i64) -> Result<Vec<PostVersion>, PostServiceError> {
        self.get(id).await?;
        Ok(self
            .repo
            .list_versions(id)
            .await
            .context("Failed to list post versions")?)
    }

    /// Bring back an earlier revision. The current one becomes a version too.
    pub async fn restore_version(
        &self,
        id: i64,
        version_id: i64,
        ctx: MutationContext,
    ) -> Result<Post, PostServiceError> {
        let previous = self.get(id).await?;
        let version = self
            .repo
            .get_version(version_id)
            .await
            .context("Failed to get post version")?
            .filter(|v| v.post_id == id)
            .ok_or(PostServiceError::VersionNotFound(version_id))?;

        let snapshot = version.snapshot;
        if snapshot.slug != previous.slug {
            self.ensure_slug_free(&snapshot.slug, Some(id)).await?;
        }
        // Categories deleted since the snapshot are dropped
        let existing: BTreeSet<i64> = self
            .category_repo
            .get_many(&snapshot.category_ids)
            .await
            .context("Failed to load categories")?
            .into_iter()
            .map(|c| c.id)
            .collect();

        let restored = Post {
            id,
            category_ids: snapshot
                .category_ids
                .iter()
                .copied()
                .filter(|c| existing.contains(c))
                .collect(),
            created_at: previous.created_at,
            ..snapshot
        };
        self.save_revision(previous, restored, ctx).await
    }

    async fn save_revision(
        &self,
        previous: Post,
        post: Post,
        ctx: MutationContext,
    ) -> Result<Post, PostServiceError> {
        self.repo
            .save_version(&previous)
            .await
            .context("Failed to save post version")?;
        let updated = self.repo.update(&post).await.context("Failed to update post")?;

        if !ctx.disable_revalidate {
            self.revalidate_change(&updated, Some(&previous)).await;
        }
        Ok(updated)
    }

    async fn revalidate_change(&self, post: &Post, previous: Option<&Post>) {
        if post.is_published() {
            self.revalidator.revalidate_path(&post.path()).await;
            self.revalidator.revalidate_tag(tags::POSTS_SITEMAP).await;
        }

        if let Some(previous) = previous.filter(|p| p.is_published()) {
            if !post.is_published() || previous.slug != post.slug {
                self.revalidator.revalidate_path(&previous.path()).await;
                self.revalidator.revalidate_tag(tags::POSTS_SITEMAP).await;
            }
        }

        let mut category_ids = BTreeSet::new();
        for doc in std::iter::once(post).chain(previous) {
            if doc.is_published() {
                category_ids.extend(doc.category_ids.iter().copied());
            }
        }
        self.revalidate_categories(category_ids).await;
    }

    async fn revalidate_categories(&self, ids: BTreeSet<i64>) {
        if ids.is_empty() {
            return;
        }
        let ids: Vec<i64> = ids.into_iter().collect();
        match self.category_repo.get_many(&ids).await {
            Ok(categories) => {
                for category in categories.iter().filter(|c| !c.slug.is_empty()) {
                    self.revalidator.revalidate_path(&category.path()).await;
                }
            }
            Err(e) => tracing::error!("Failed to load categories for revalidation: {}", e),
        }
    }

    /// Unique ids, every one of an existing category
    async fn checked_categories(&self, ids: Vec<i64>) -> Result<Vec<i64>, PostServiceError> {
        let unique: Vec<i64> = ids
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if unique.is_empty() {
            return Ok(unique);
        }
        let found = self
            .category_repo
            .get_many(&unique)
            .await
            .context("Failed to load categories")?;
        if let Some(missing) = unique.iter().find(|id| !found.iter().any(|c| c.id == **id)) {
            return Err(PostServiceError::ValidationError(format!(
                "Category not found: {}",
                missing
            )));
        }
        Ok(unique)
    }

    async fn ensure_slug_free(&self, slug: &str, own_id: Option<i64>) -> Result<(), PostServiceError> {
        match self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            Some(other) if Some(other.id) != own_id => {
                Err(PostServiceError::DuplicateSlug(slug.to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Published documents always carry a publish date
fn stamp_published_at(post: &mut Post) {
    if post.is_published() && post.published_at.is_none() {
        post.published_at = Some(Utc::now());
    }
}

fn required_title(title: &str) -> Result<String, PostServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PostServiceError::ValidationError("Title is required".to_string()));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{create_cache, tagged_key, Cache, CacheLayer};
    use crate::config::{CacheConfig, RevalidationConfig, SiteConfig};
    use crate::db::repositories::{SqlxCategoryRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreateCategoryInput;
    use crate::services::category::CategoryService;
    use crate::services::revalidation::path_tag;
    use std::time::Duration;

    struct Fixture {
        cache: Arc<Cache>,
        posts: PostService,
        categories: CategoryService,
    }

    async fn fixture() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let cache = create_cache(&CacheConfig::default()).await.unwrap();
        let revalidator = Arc::new(Revalidator::new(
            cache.clone(),
            &SiteConfig::default(),
            &RevalidationConfig::default(),
        ));
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        Fixture {
            cache,
            posts: PostService::new(
                SqlxPostRepository::boxed(pool),
                category_repo.clone(),
                revalidator.clone(),
            ),
            categories: CategoryService::new(category_repo, revalidator),
        }
    }

    fn input(title: &str, status: PublishStatus) -> CreatePostInput {
        CreatePostInput {
            title: title.to_string(),
            slug: None,
            content: "Update from the studio".to_string(),
            hero_image_id: None,
            status,
            published_at: None,
            category_ids: Vec::new(),
            meta: Default::default(),
            impact: Default::default(),
            font_override: None,
        }
    }

    async fn mark(cache: &Cache, path: &str) -> String {
        let key = tagged_key(&[path_tag(path).as_str()], "html");
        cache.set(&key, &1_i64, Duration::from_secs(60)).await.unwrap();
        key
    }

    async fn is_cached(cache: &Cache, key: &str) -> bool {
        cache.get::<i64>(key).await.unwrap().is_some()
    }

    #[tokio::test]
    async fn test_create_published_stamps_date() {
        let f = fixture().await;
        let post = f
            .posts
            .create(input("Launch Day", PublishStatus::Published), MutationContext::default())
            .await
            .unwrap();
        assert_eq!(post.slug, "launch-day");
        assert!(post.published_at.is_some());
        assert_eq!(post.font_override, "default");

        let draft = f
            .posts
            .create(input("Draft", PublishStatus::Draft), MutationContext::default())
            .await
            .unwrap();
        assert!(draft.published_at.is_none());
        assert!(f.posts.find_published("draft").await.unwrap().is_none());
        assert!(f.posts.find_published("launch-day").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_font_and_category_rejected() {
        let f = fixture().await;
        let mut bad_font = input("Fonts", PublishStatus::Draft);
        bad_font.font_override = Some("wingdings".to_string());
        assert!(matches!(
            f.posts.create(bad_font, MutationContext::default()).await,
            Err(PostServiceError::ValidationError(_))
        ));

        let mut bad_category = input("Cats", PublishStatus::Draft);
        bad_category.category_ids = vec![404];
        assert!(matches!(
            f.posts.create(bad_category, MutationContext::default()).await,
            Err(PostServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_update_snapshots_and_restore() {
        let f = fixture().await;
        let post = f
            .posts
            .create(input("Original", PublishStatus::Draft), MutationContext::quiet())
            .await
            .unwrap();

        f.posts
            .update(
                post.id,
                UpdatePostInput {
                    title: Some("Edited".to_string()),
                    content: Some("New body".to_string()),
                    ..Default::default()
                },
                MutationContext::quiet(),
            )
            .await
            .unwrap();

        let versions = f.posts.list_versions(post.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].snapshot.title, "Original");

        let restored = f
            .posts
            .restore_version(post.id, versions[0].id, MutationContext::quiet())
            .await
            .unwrap();
        assert_eq!(restored.title, "Original");
        assert_eq!(restored.content, "Update from the studio");
        assert_eq!(f.posts.list_versions(post.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_restore_rejects_foreign_version() {
        let f = fixture().await;
        let a = f
            .posts
            .create(input("A", PublishStatus::Draft), MutationContext::quiet())
            .await
            .unwrap();
        let b = f
            .posts
            .create(input("B", PublishStatus::Draft), MutationContext::quiet())
            .await
            .unwrap();
        f.posts
            .update(
                a.id,
                UpdatePostInput {
                    content: Some("x".to_string()),
                    ..Default::default()
                },
                MutationContext::quiet(),
            )
            .await
            .unwrap();
        let version = f.posts.list_versions(a.id).await.unwrap()[0].id;
        assert!(matches!(
            f.posts.restore_version(b.id, version, MutationContext::quiet()).await,
            Err(PostServiceError::VersionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unpublish_revalidates_old_path_and_categories() {
        let f = fixture().await;
        let category = f
            .categories
            .create(
                CreateCategoryInput {
                    title: "News".to_string(),
                    slug: None,
                },
                MutationContext::quiet(),
            )
            .await
            .unwrap();
        let mut published = input("Big News", PublishStatus::Published);
        published.category_ids = vec![category.id];
        let post = f
            .posts
            .create(published, MutationContext::quiet())
            .await
            .unwrap();

        let post_key = mark(&f.cache, "/posts/big-news").await;
        let category_key = mark(&f.cache, "/categories/news").await;
        let sitemap_key = tagged_key(&[tags::POSTS_SITEMAP], "sitemap");
        f.cache.set(&sitemap_key, &1_i64, Duration::from_secs(60)).await.unwrap();

        f.posts
            .update(
                post.id,
                UpdatePostInput {
                    status: Some(PublishStatus::Draft),
                    ..Default::default()
                },
                MutationContext::default(),
            )
            .await
            .unwrap();

        assert!(!is_cached(&f.cache, &post_key).await);
        assert!(!is_cached(&f.cache, &category_key).await);
        assert!(!is_cached(&f.cache, &sitemap_key).await);
    }

    #[tokio::test]
    async fn test_draft_changes_leave_category_pages_cached() {
        let f = fixture().await;
        let category = f
            .categories
            .create(
                CreateCategoryInput {
                    title: "Art".to_string(),
                    slug: None,
                },
                MutationContext::quiet(),
            )
            .await
            .unwrap();
        let mut draft = input("Sketches", PublishStatus::Draft);
        draft.category_ids = vec![category.id];
        let post = f.posts.create(draft, MutationContext::quiet()).await.unwrap();

        let category_key = mark(&f.cache, "/categories/art").await;
        f.posts
            .update(
                post.id,
                UpdatePostInput {
                    content: Some("More sketches".to_string()),
                    ..Default::default()
                },
                MutationContext::default(),
            )
            .await
            .unwrap();
        assert!(is_cached(&f.cache, &category_key).await);
    }

    #[tokio::test]
    async fn test_published_listing_pages() {
        let f = fixture().await;
        for i in 0..14 {
            f.posts
                .create(
                    input(&format!("Post {}", i), PublishStatus::Published),
                    MutationContext::quiet(),
                )
                .await
                .unwrap();
        }
        f.posts
            .create(input("Hidden", PublishStatus::Draft), MutationContext::quiet())
            .await
            .unwrap();

        let first = f.posts.list_published(1).await.unwrap();
        assert_eq!(first.items.len(), 12);
        assert_eq!(first.total, 14);
        assert_eq!(first.total_pages(), 2);
        assert_eq!(f.posts.list_published(2).await.unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn test_update_rejects_slug_without_letters() {
        let f = fixture().await;
        let post = f
            .posts
            .create(input("Launch Day", PublishStatus::Draft), MutationContext::quiet())
            .await
            .unwrap();
        let result = f
            .posts
            .update(
                post.id,
                UpdatePostInput {
                    slug: Some("--!--".to_string()),
                    ..Default::default()
                },
                MutationContext::quiet(),
            )
            .await;
        assert!(matches!(result, Err(PostServiceError::ValidationError(_))));
    }
}
