//! Page repository
//!
//! The hero links and the layout blocks are stored as JSON text columns and
//! decoded through [`PageRow`].

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{ListParams, Page, PageRow, PageVersion, PagedResult, PublishStatus};
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const PAGE_COLUMNS: &str = "id, title, slug, status, published_at, hero_type, hero_rich_text, hero_media_id, hero_links, layout, meta_title, meta_description, meta_image_id, font_override, created_at, updated_at";

/// Revisions kept per page
pub const MAX_PAGE_VERSIONS: i64 = 50;

#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn create(&self, page: &Page) -> Result<Page>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Page>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>>;

    /// Ordered by title, optionally filtered by status
    async fn list(
        &self,
        status: Option<PublishStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Page>>;

    async fn update(&self, page: &Page) -> Result<Page>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn save_version(&self, page: &Page) -> Result<PageVersion>;

    /// Newest first
    async fn list_versions(&self, page_id: i64) -> Result<Vec<PageVersion>>;

    async fn get_version(&self, version_id: i64) -> Result<Option<PageVersion>>;
}

pub struct SqlxPageRepository {
    pool: DynDatabasePool,
}

impl SqlxPageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PageRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Serialized JSON columns of a page
fn json_columns(page: &Page) -> Result<(String, String)> {
    let links = serde_json::to_string(&page.hero.links).context("Failed to encode hero links")?;
    let layout = serde_json::to_string(&page.layout).context("Failed to encode page layout")?;
    Ok((links, layout))
}

fn decode_version(row: (i64, i64, String, DateTime<Utc>)) -> Result<PageVersion> {
    let (id, page_id, snapshot, created_at) = row;
    Ok(PageVersion {
        id,
        page_id,
        snapshot: serde_json::from_str(&snapshot).context("Failed to decode page snapshot")?,
        created_at,
    })
}

#[async_trait]
impl PageRepository for SqlxPageRepository {
    async fn create(&self, page: &Page) -> Result<Page> {
        let now = Utc::now();
        let (links, layout) = json_columns(page)?;
        let id = with_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO pages (title, slug, status, published_at, hero_type, hero_rich_text, hero_media_id,
                    hero_links, layout, meta_title, meta_description, meta_image_id, font_override, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&page.title)
            .bind(&page.slug)
            .bind(page.status.as_str())
            .bind(page.published_at)
            .bind(page.hero.hero_type.as_str())
            .bind(&page.hero.rich_text)
            .bind(page.hero.media_id)
            .bind(&links)
            .bind(&layout)
            .bind(&page.meta.title)
            .bind(&page.meta.description)
            .bind(page.meta.image_id)
            .bind(&page.font_override)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create page")?
            .insert_id()
        });
        Ok(Page {
            id,
            created_at: now,
            updated_at: now,
            ..page.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Page>> {
        let sql = format!("SELECT {} FROM pages WHERE id = ?", PAGE_COLUMNS);
        let row = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, PageRow>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get page by ID")?
        });
        row.map(Page::try_from).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>> {
        let sql = format!("SELECT {} FROM pages WHERE slug = ?", PAGE_COLUMNS);
        let row = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, PageRow>(&sql)
                .bind(slug)
                .fetch_optional(conn)
                .await
                .context("Failed to get page by slug")?
        });
        row.map(Page::try_from).transpose()
    }

    async fn list(
        &self,
        status: Option<PublishStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Page>> {
        let filter = if status.is_some() { "WHERE status = ?" } else { "" };
        let sql = format!(
            "SELECT {} FROM pages {} ORDER BY title ASC, id ASC LIMIT ? OFFSET ?",
            PAGE_COLUMNS, filter
        );
        let count_sql = format!("SELECT COUNT(*) FROM pages {}", filter);

        let (rows, total) = with_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, PageRow>(&sql);
            let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
            if let Some(status) = status {
                query = query.bind(status.as_str());
                count = count.bind(status.as_str());
            }
            let rows = query
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list pages")?;
            let total = count
                .fetch_one(conn)
                .await
                .context("Failed to count pages")?;
            (rows, total)
        });
        let items = rows
            .into_iter()
            .map(Page::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn update(&self, page: &Page) -> Result<Page> {
        let now = Utc::now();
        let (links, layout) = json_columns(page)?;
        with_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                UPDATE pages
                SET title = ?, slug = ?, status = ?, published_at = ?, hero_type = ?, hero_rich_text = ?,
                    hero_media_id = ?, hero_links = ?, layout = ?, meta_title = ?, meta_description = ?,
                    meta_image_id = ?, font_override = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&page.title)
            .bind(&page.slug)
            .bind(page.status.as_str())
            .bind(page.published_at)
            .bind(page.hero.hero_type.as_str())
            .bind(&page.hero.rich_text)
            .bind(page.hero.media_id)
            .bind(&links)
            .bind(&layout)
            .bind(&page.meta.title)
            .bind(&page.meta.description)
            .bind(page.meta.image_id)
            .bind(&page.font_override)
            .bind(now)
            .bind(page.id)
            .execute(conn)
            .await
            .context("Failed to update page")?;
        });
        Ok(Page {
            updated_at: now,
            ..page.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM pages WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete page")?;
        });
        Ok(())
    }

    async fn save_version(&self, page: &Page) -> Result<PageVersion> {
        let now = Utc::now();
        let snapshot = serde_json::to_string(page).context("Failed to encode page snapshot")?;
        let id = with_pool!(self.pool, conn => {
            let id = sqlx::query(
                "INSERT INTO page_versions (page_id, snapshot, created_at) VALUES (?, ?, ?)",
            )
            .bind(page.id)
            .bind(&snapshot)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to save page version")?
            .insert_id();

            let stale = sqlx::query_scalar::<_, i64>(
                "SELECT id FROM page_versions WHERE page_id = ? ORDER BY id DESC LIMIT 1000 OFFSET ?",
            )
            .bind(page.id)
            .bind(MAX_PAGE_VERSIONS)
            .fetch_all(conn)
            .await
            .context("Failed to find stale page versions")?;
            for version_id in stale {
                sqlx::query("DELETE FROM page_versions WHERE id = ?")
                    .bind(version_id)
                    .execute(conn)
                    .await
                    .context("Failed to prune page versions")?;
            }
            id
        });
        Ok(PageVersion {
            id,
            page_id: page.id,
            snapshot: page.clone(),
            created_at: now,
        })
    }

    async fn list_versions(&self, page_id: i64) -> Result<Vec<PageVersion>> {
        let rows = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, (i64, i64, String, DateTime<Utc>)>(
                "SELECT id, page_id, snapshot, created_at FROM page_versions WHERE page_id = ? ORDER BY id DESC",
            )
            .bind(page_id)
            .fetch_all(conn)
            .await
            .context("Failed to list page versions")?
        });
        rows.into_iter().map(decode_version).collect()
    }

    async fn get_version(&self, version_id: i64) -> Result<Option<PageVersion>> {
        let row = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, (i64, i64, String, DateTime<Utc>)>(
                "SELECT id, page_id, snapshot, created_at FROM page_versions WHERE id = ?",
            )
            .bind(version_id)
            .fetch_optional(conn)
            .await
            .context("Failed to get page version")?
        });
        row.map(decode_version).transpose()
    }
}

#[cfg(test)]
pub(crate) fn sample_page(slug: &str, status: PublishStatus) -> Page {
    let now = Utc::now();
    Page {
        id: 0,
        title: format!("Page {}", slug),
        slug: slug.to_string(),
        status,
        published_at: (status == PublishStatus::Published).then_some(now),
        hero: Default::default(),
        layout: Vec::new(),
        meta: Default::default(),
        font_override: "default".to_string(),
        created_at: now,
        updated_at: now,
    }
}
