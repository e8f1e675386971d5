//! Category service
//!
//! Post categories: create, read, update, delete with slug uniqueness.
//! Every change revalidates the category's public listing.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CreateCategoryInput, ListParams, PagedResult, UpdateCategoryInput};
use crate::services::revalidation::{MutationContext, Revalidator};
use crate::services::slug::slug_or_generate;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    revalidator: Arc<Revalidator>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, revalidator: Arc<Revalidator>) -> Self {
        Self { repo, revalidator }
    }

    /// Create a category; the slug is generated from the title when blank
    pub async fn create(
        &self,
        input: CreateCategoryInput,
        ctx: MutationContext,
    ) -> Result<Category, CategoryServiceError> {
        let title = validate_title(&input.title)?;
        let slug = validate_slug(slug_or_generate(input.slug.as_deref(), &title))?;
        self.ensure_slug_free(&slug, None).await?;

        let now = Utc::now();
        let category = self
            .repo
            .create(&Category {
                id: 0,
                title,
                slug,
                created_at: now,
                updated_at: now,
            })
            .await
            .context("Failed to create category")?;

        if !ctx.disable_revalidate {
            self.revalidator.revalidate_path(&category.path()).await;
        }
        Ok(category)
    }

    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?
            .ok_or_else(|| CategoryServiceError::NotFound(slug.to_string()))
    }

    /// Lookup used by the frontend, `None` for unknown slugs
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, CategoryServiceError> {
        Ok(self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?)
    }

    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self
            .repo
            .get_many(ids)
            .await
            .context("Failed to get categories")?)
    }

    pub async fn list(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Category>, CategoryServiceError> {
        Ok(self
            .repo
            .list(params)
            .await
            .context("Failed to list categories")?)
    }

    /// Update a category. A slug change revalidates both listings.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateCategoryInput,
        ctx: MutationContext,
    ) -> Result<Category, CategoryServiceError> {
        let previous = self.get(id).await?;
        let mut category = previous.clone();

        if let Some(title) = input.title {
            category.title = validate_title(&title)?;
        }
        if let Some(slug) = input.slug {
            let slug = validate_slug(slug_or_generate(Some(&slug), &category.title))?;
            if slug != previous.slug {
                self.ensure_slug_free(&slug, Some(id)).await?;
            }
            category.slug = slug;
        }

        let updated = self
            .repo
            .update(&category)
            .await
            .context("Failed to update category")?;

        if !ctx.disable_revalidate {
            self.revalidator.revalidate_path(&updated.path()).await;
            if previous.slug != updated.slug {
                self.revalidator.revalidate_path(&previous.path()).await;
            }
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, ctx: MutationContext) -> Result<(), CategoryServiceError> {
        let category = self.get(id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete category")?;

        if !ctx.disable_revalidate {
            self.revalidator.revalidate_path(&category.path()).await;
        }
        Ok(())
    }

    async fn ensure_slug_free(
        &self,
        slug: &str,
        own_id: Option<i64>,
    ) -> Result<(), CategoryServiceError> {
        let existing = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check slug uniqueness")?;
        match existing {
            Some(other) if Some(other.id) != own_id => {
                Err(CategoryServiceError::DuplicateSlug(slug.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn validate_title(title: &str) -> Result<String, CategoryServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Title is required".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn validate_slug(slug: String) -> Result<String, CategoryServiceError> {
    if slug.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Slug cannot be empty".to_string(),
        ));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{create_cache, tagged_key, CacheLayer};
    use crate::config::{CacheConfig, RevalidationConfig, SiteConfig};
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::services::revalidation::path_tag;
    use std::time::Duration;

    async fn setup() -> (Arc<crate::cache::Cache>, CategoryService) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let cache = create_cache(&CacheConfig::default()).await.unwrap();
        let revalidator = Arc::new(Revalidator::new(
            cache.clone(),
            &SiteConfig::default(),
            &RevalidationConfig::default(),
        ));
        let service = CategoryService::new(SqlxCategoryRepository::boxed(pool), revalidator);
        (cache, service)
    }

    fn input(title: &str) -> CreateCategoryInput {
        CreateCategoryInput {
            title: title.to_string(),
            slug: None,
        }
    }

    #[tokio::test]
    async fn test_create_generates_slug() {
        let (_, service) = setup().await;
        let category = service
            .create(input("Behind the Scenes"), MutationContext::default())
            .await
            .unwrap();
        assert_eq!(category.slug, "behind-the-scenes");
        assert_eq!(category.path(), "/categories/behind-the-scenes");
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let (_, service) = setup().await;
        service
            .create(input("News"), MutationContext::default())
            .await
            .unwrap();
        let result = service.create(input("News"), MutationContext::default()).await;
        assert!(matches!(result, Err(CategoryServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let (_, service) = setup().await;
        let result = service.create(input("   "), MutationContext::default()).await;
        assert!(matches!(result, Err(CategoryServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_revalidates_old_and_new_listing() {
        let (cache, service) = setup().await;
        let category = service
            .create(input("Lore"), MutationContext::default())
            .await
            .unwrap();

        let ttl = Duration::from_secs(60);
        let old_key = tagged_key(&[path_tag("/categories/lore").as_str()], "page");
        cache.set(&old_key, &1_i64, ttl).await.unwrap();

        let updated = service
            .update(
                category.id,
                UpdateCategoryInput {
                    slug: Some("world-lore".to_string()),
                    ..Default::default()
                },
                MutationContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "world-lore");
        assert!(cache.get::<i64>(&old_key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disable_revalidate_keeps_cache() {
        let (cache, service) = setup().await;
        let category = service
            .create(input("Art"), MutationContext::default())
            .await
            .unwrap();
        let key = tagged_key(&[path_tag("/categories/art").as_str()], "page");
        cache.set(&key, &1_i64, Duration::from_secs(60)).await.unwrap();

        service.delete(category.id, MutationContext::quiet()).await.unwrap();
        assert_eq!(cache.get::<i64>(&key).await.unwrap(), Some(1));
        assert!(matches!(
            service.get(category.id).await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }
}
