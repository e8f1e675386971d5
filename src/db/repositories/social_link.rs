//! Social link repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::SocialLink;
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::media::placeholders;

const SOCIAL_COLUMNS: &str = "id, label, platform, url, sort_order, created_at, updated_at";

/// Upper bound on links loaded for the footer and the admin list
pub const MAX_SOCIAL_LINKS: i64 = 100;

#[async_trait]
pub trait SocialLinkRepository: Send + Sync {
    async fn create(&self, link: &SocialLink) -> Result<SocialLink>;

    async fn get_by_id(&self, id: i64) -> Result<Option<SocialLink>>;

    async fn get_by_url(&self, url: &str) -> Result<Option<SocialLink>>;

    /// Ordered by `sort_order`, then id
    async fn list(&self) -> Result<Vec<SocialLink>>;

    /// The given links in display order, skipping missing ids
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<SocialLink>>;

    async fn update(&self, link: &SocialLink) -> Result<SocialLink>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxSocialLinkRepository {
    pool: DynDatabasePool,
}

impl SqlxSocialLinkRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SocialLinkRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SocialLinkRepository for SqlxSocialLinkRepository {
    async fn create(&self, link: &SocialLink) -> Result<SocialLink> {
        let now = Utc::now();
        let id = with_pool!(self.pool, conn => {
            sqlx::query(
                "INSERT INTO social_links (label, platform, url, sort_order, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&link.label)
            .bind(link.platform.as_str())
            .bind(&link.url)
            .bind(link.sort_order)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create social link")?
            .insert_id()
        });
        Ok(SocialLink {
            id,
            created_at: now,
            updated_at: now,
            ..link.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<SocialLink>> {
        let sql = format!("SELECT {} FROM social_links WHERE id = ?", SOCIAL_COLUMNS);
        let link = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, SocialLink>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get social link by ID")?
        });
        Ok(link)
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<SocialLink>> {
        let sql = format!("SELECT {} FROM social_links WHERE url = ?", SOCIAL_COLUMNS);
        let link = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, SocialLink>(&sql)
                .bind(url)
                .fetch_optional(conn)
                .await
                .context("Failed to get social link by URL")?
        });
        Ok(link)
    }

    async fn list(&self) -> Result<Vec<SocialLink>> {
        let sql = format!(
            "SELECT {} FROM social_links ORDER BY sort_order ASC, id ASC LIMIT ?",
            SOCIAL_COLUMNS
        );
        let links = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, SocialLink>(&sql)
                .bind(MAX_SOCIAL_LINKS)
                .fetch_all(conn)
                .await
                .context("Failed to list social links")?
        });
        Ok(links)
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<SocialLink>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM social_links WHERE id IN ({}) ORDER BY sort_order ASC, id ASC",
            SOCIAL_COLUMNS,
            placeholders(ids.len())
        );
        let links = with_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, SocialLink>(&sql);
            for id in ids {
                query = query.bind(*id);
            }
            query
                .fetch_all(conn)
                .await
                .context("Failed to load social links")?
        });
        Ok(links)
    }

    async fn update(&self, link: &SocialLink) -> Result<SocialLink> {
        let now = Utc::now();
        with_pool!(self.pool, conn => {
            sqlx::query(
                "UPDATE social_links SET label = ?, platform = ?, url = ?, sort_order = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&link.label)
            .bind(link.platform.as_str())
            .bind(&link.url)
            .bind(link.sort_order)
            .bind(now)
            .bind(link.id)
            .execute(conn)
            .await
            .context("Failed to update social link")?;
        });
        Ok(SocialLink {
            updated_at: now,
            ..link.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM social_links WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete social link")?;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::Platform;

    fn link(label: &str, platform: Platform, url: &str, sort_order: i64) -> SocialLink {
        let now = Utc::now();
        SocialLink {
            id: 0,
            label: label.to_string(),
            platform,
            url: url.to_string(),
            sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_orders_by_sort_order_then_id() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxSocialLinkRepository::new(pool);

        repo.create(&link("Patreon", Platform::Patreon, "https://patreon.com/x", 2))
            .await
            .unwrap();
        let ig = repo
            .create(&link("Instagram", Platform::Instagram, "https://instagram.com/x", 0))
            .await
            .unwrap();
        repo.create(&link("Discord", Platform::Discord, "https://discord.gg/x", 0))
            .await
            .unwrap();

        let labels: Vec<String> = repo.list().await.unwrap().into_iter().map(|l| l.label).collect();
        assert_eq!(labels, vec!["Instagram", "Discord", "Patreon"]);

        let found = repo.get_by_url("https://instagram.com/x").await.unwrap().unwrap();
        assert_eq!(found.id, ig.id);
        assert_eq!(found.platform, Platform::Instagram);
    }

    #[tokio::test]
    async fn test_url_is_unique() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxSocialLinkRepository::new(pool);

        let first = repo
            .create(&link("YouTube", Platform::Youtube, "https://youtube.com/@x", 0))
            .await
            .unwrap();
        assert!(repo
            .create(&link("Again", Platform::Youtube, "https://youtube.com/@x", 1))
            .await
            .is_err());

        let mut moved = first.clone();
        moved.sort_order = 9;
        repo.update(&moved).await.unwrap();
        assert_eq!(repo.get_many(&[first.id]).await.unwrap()[0].sort_order, 9);

        repo.delete(first.id).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
    }
}
