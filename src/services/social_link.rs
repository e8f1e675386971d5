//! Social link service
//!
//! Footer social links. Reads go through a cached fetcher tagged
//! `collection_social-links`; every write revalidates that tag.

use crate::cache::Cache;
use crate::db::repositories::SocialLinkRepository;
use crate::models::{CreateSocialLinkInput, SocialLink, UpdateSocialLinkInput};
use crate::services::revalidation::{tags, MutationContext, Revalidator};
use crate::services::validation::validate_url;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const SOCIAL_LINKS_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum SocialLinkServiceError {
    #[error("Social link not found: {0}")]
    NotFound(i64),

    #[error("Social link URL already exists: {0}")]
    DuplicateUrl(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct SocialLinkService {
    repo: Arc<dyn SocialLinkRepository>,
    cache: Arc<Cache>,
    revalidator: Arc<Revalidator>,
}

impl SocialLinkService {
    pub fn new(
        repo: Arc<dyn SocialLinkRepository>,
        cache: Arc<Cache>,
        revalidator: Arc<Revalidator>,
    ) -> Self {
        Self {
            repo,
            cache,
            revalidator,
        }
    }

    pub async fn create(
        &self,
        input: CreateSocialLinkInput,
        ctx: MutationContext,
    ) -> Result<SocialLink, SocialLinkServiceError> {
        let label = required_label(&input.label)?;
        let url = checked_url(&input.url)?;
        self.ensure_url_free(&url, None).await?;

        let now = Utc::now();
        let link = self
            .repo
            .create(&SocialLink {
                id: 0,
                label,
                platform: input.platform,
                url,
                sort_order: input.sort_order,
                created_at: now,
                updated_at: now,
            })
            .await
            .context("Failed to create social link")?;

        self.after_change(ctx).await;
        Ok(link)
    }

    pub async fn get(&self, id: i64) -> Result<SocialLink, SocialLinkServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get social link")?
            .ok_or(SocialLinkServiceError::NotFound(id))
    }

    /// Uncached list for the admin API
    pub async fn list(&self) -> Result<Vec<SocialLink>, SocialLinkServiceError> {
        Ok(self.repo.list().await.context("Failed to list social links")?)
    }

    /// Cached list for the frontend, ordered by sort order then id
    pub async fn list_cached(&self) -> Result<Vec<SocialLink>, SocialLinkServiceError> {
        let repo = self.repo.clone();
        Ok(self
            .cache
            .remember(
                &[tags::COLLECTION_SOCIAL_LINKS],
                "all",
                SOCIAL_LINKS_CACHE_TTL,
                || async move { repo.list().await.context("Failed to list social links") },
            )
            .await?)
    }

    /// Links shown in the footer: the selected ids, or every link when the
    /// selection is empty
    pub async fn for_footer(&self, selected: &[i64]) -> Result<Vec<SocialLink>, SocialLinkServiceError> {
        let links = self.list_cached().await?;
        if selected.is_empty() {
            return Ok(links);
        }
        Ok(links
            .into_iter()
            .filter(|link| selected.contains(&link.id))
            .collect())
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateSocialLinkInput,
        ctx: MutationContext,
    ) -> Result<SocialLink, SocialLinkServiceError> {
        let mut link = self.get(id).await?;

        if let Some(label) = input.label {
            link.label = required_label(&label)?;
        }
        if let Some(platform) = input.platform {
            link.platform = platform;
        }
        if let Some(url) = input.url {
            let url = checked_url(&url)?;
            if url != link.url {
                self.ensure_url_free(&url, Some(id)).await?;
            }
            link.url = url;
        }
        if let Some(sort_order) = input.sort_order {
            link.sort_order = sort_order;
        }

        let updated = self
            .repo
            .update(&link)
            .await
            .context("Failed to update social link")?;
        self.after_change(ctx).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, ctx: MutationContext) -> Result<(), SocialLinkServiceError> {
        self.get(id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete social link")?;
        self.after_change(ctx).await;
        Ok(())
    }

    async fn after_change(&self, ctx: MutationContext) {
        if !ctx.disable_revalidate {
            self.revalidator
                .revalidate_tag(tags::COLLECTION_SOCIAL_LINKS)
                .await;
        }
    }

    async fn ensure_url_free(
        &self,
        url: &str,
        own_id: Option<i64>,
    ) -> Result<(), SocialLinkServiceError> {
        match self
            .repo
            .get_by_url(url)
            .await
            .context("Failed to check URL uniqueness")?
        {
            Some(other) if Some(other.id) != own_id => {
                Err(SocialLinkServiceError::DuplicateUrl(url.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn required_label(label: &str) -> Result<String, SocialLinkServiceError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(SocialLinkServiceError::ValidationError(
            "Label is required.".to_string(),
        ));
    }
    Ok(label.to_string())
}

fn checked_url(url: &str) -> Result<String, SocialLinkServiceError> {
    let url = url.trim();
    validate_url(url).map_err(|message| SocialLinkServiceError::ValidationError(message.to_string()))?;
    Ok(url.to_string())
}
