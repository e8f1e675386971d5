//! Media repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{CreateMediaInput, ListParams, Media, PagedResult};
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

const MEDIA_COLUMNS: &str = "id, alt, caption, filename, mime_type, filesize, width, height, url, cloudinary_public_id, created_at, updated_at";

#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn create(&self, input: &CreateMediaInput) -> Result<Media>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Media>>;

    /// Load several media items at once, keyed by id
    async fn get_many(&self, ids: &[i64]) -> Result<HashMap<i64, Media>>;

    /// Newest first
    async fn list(&self, params: &ListParams) -> Result<PagedResult<Media>>;

    async fn update(&self, media: &Media) -> Result<Media>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Whether any episode page still shows this image
    async fn is_used_by_episode_pages(&self, id: i64) -> Result<bool>;
}

pub struct SqlxMediaRepository {
    pool: DynDatabasePool,
}

impl SqlxMediaRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MediaRepository> {
        Arc::new(Self::new(pool))
    }
}

/// `?, ?, ?` for an IN clause with `n` parameters
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[async_trait]
impl MediaRepository for SqlxMediaRepository {
    async fn create(&self, input: &CreateMediaInput) -> Result<Media> {
        let now = Utc::now();
        let id = with_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO media (alt, caption, filename, mime_type, filesize, width, height, url, cloudinary_public_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&input.alt)
            .bind(&input.caption)
            .bind(&input.filename)
            .bind(&input.mime_type)
            .bind(input.filesize)
            .bind(input.width)
            .bind(input.height)
            .bind(&input.url)
            .bind(&input.cloudinary_public_id)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create media")?
            .insert_id()
        });

        Ok(Media {
            id,
            alt: input.alt.clone(),
            caption: input.caption.clone(),
            filename: input.filename.clone(),
            mime_type: input.mime_type.clone(),
            filesize: input.filesize,
            width: input.width,
            height: input.height,
            url: input.url.clone(),
            cloudinary_public_id: input.cloudinary_public_id.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Media>> {
        let sql = format!("SELECT {} FROM media WHERE id = ?", MEDIA_COLUMNS);
        let media = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, Media>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get media by ID")?
        });
        Ok(media)
    }

    async fn get_many(&self, ids: &[i64]) -> Result<HashMap<i64, Media>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT {} FROM media WHERE id IN ({})",
            MEDIA_COLUMNS,
            placeholders(ids.len())
        );
        let items = with_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, Media>(&sql);
            for id in ids {
                query = query.bind(*id);
            }
            query.fetch_all(conn).await.context("Failed to load media")?
        });
        Ok(items.into_iter().map(|m| (m.id, m)).collect())
    }

    async fn list(&self, params: &ListParams) -> Result<PagedResult<Media>> {
        let sql = format!(
            "SELECT {} FROM media ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            MEDIA_COLUMNS
        );
        let (items, total) = with_pool!(self.pool, conn => {
            let items = sqlx::query_as::<_, Media>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list media")?;
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM media")
                .fetch_one(conn)
                .await
                .context("Failed to count media")?;
            (items, total)
        });
        Ok(PagedResult::new(items, total, params))
    }

    async fn update(&self, media: &Media) -> Result<Media> {
        let now = Utc::now();
        with_pool!(self.pool, conn => {
            sqlx::query(
                "UPDATE media SET alt = ?, caption = ?, cloudinary_public_id = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&media.alt)
            .bind(&media.caption)
            .bind(&media.cloudinary_public_id)
            .bind(now)
            .bind(media.id)
            .execute(conn)
            .await
            .context("Failed to update media")?;
        });
        Ok(Media {
            updated_at: now,
            ..media.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM media WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete media")?;
        });
        Ok(())
    }

    async fn is_used_by_episode_pages(&self, id: i64) -> Result<bool> {
        let count = with_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM episode_pages WHERE image_id = ?")
                .bind(id)
                .fetch_one(conn)
                .await
                .context("Failed to check media usage")?
        });
        Ok(count > 0)
    }
}

#[cfg(test)]
pub(crate) fn media_input(filename: &str) -> CreateMediaInput {
    CreateMediaInput {
        alt: format!("alt for {}", filename),
        caption: None,
        filename: filename.to_string(),
        mime_type: "image/png".to_string(),
        filesize: 2048,
        width: Some(600),
        height: Some(840),
        url: format!("/uploads/{}", filename),
        cloudinary_public_id: None,
    }
}
