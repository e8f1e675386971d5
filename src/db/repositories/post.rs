//! Post repository
//!
//! Category links live in `post_categories` and are replaced as a whole on
//! every write. Snapshots of earlier revisions go to `post_versions`.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{ListParams, PagedResult, Post, PostVersion, PublishStatus};
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::contains_pattern;
use super::media::placeholders;

const POST_COLUMNS: &str = "id, title, slug, content, hero_image_id, status, published_at, meta_title, meta_description, meta_image_id, impact, font_override, created_at, updated_at";

/// Revisions kept per post
pub const MAX_POST_VERSIONS: i64 = 50;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &Post) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// All posts, newest first, optionally filtered by status
    async fn list(
        &self,
        status: Option<PublishStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Post>>;

    /// Published posts in a category, newest first
    async fn list_by_category(
        &self,
        category_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>>;

    async fn update(&self, post: &Post) -> Result<Post>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Case-insensitive match on title, slug and SEO fields of published posts
    async fn search(&self, term: &str, limit: i64) -> Result<Vec<Post>>;

    /// Store a snapshot of `post`, dropping the oldest beyond the limit
    async fn save_version(&self, post: &Post) -> Result<PostVersion>;

    /// Newest first
    async fn list_versions(&self, post_id: i64) -> Result<Vec<PostVersion>>;

    async fn get_version(&self, version_id: i64) -> Result<Option<PostVersion>>;
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }

    /// Fill `category_ids` for every post in the slice
    async fn attach_categories(&self, posts: &mut [Post]) -> Result<()> {
        if posts.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let sql = format!(
            "SELECT post_id, category_id FROM post_categories WHERE post_id IN ({}) ORDER BY category_id",
            placeholders(ids.len())
        );
        let rows = with_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, (i64, i64)>(&sql);
            for id in &ids {
                query = query.bind(*id);
            }
            query
                .fetch_all(conn)
                .await
                .context("Failed to load post categories")?
        });

        let mut by_post: HashMap<i64, Vec<i64>> = HashMap::new();
        for (post_id, category_id) in rows {
            by_post.entry(post_id).or_default().push(category_id);
        }
        for post in posts.iter_mut() {
            post.category_ids = by_post.remove(&post.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn fetch_one(&self, column: &str, id: Option<i64>, slug: Option<&str>) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE {} = ?", POST_COLUMNS, column);
        let post = with_pool!(self.pool, conn => {
            let query = sqlx::query_as::<_, Post>(&sql);
            let query = match (id, slug) {
                (Some(id), _) => query.bind(id),
                (None, slug) => query.bind(slug.unwrap_or_default()),
            };
            query
                .fetch_optional(conn)
                .await
                .with_context(|| format!("Failed to get post by {}", column))?
        });
        match post {
            Some(post) => {
                let mut posts = vec![post];
                self.attach_categories(&mut posts).await?;
                Ok(posts.pop())
            }
            None => Ok(None),
        }
    }

    async fn fetch_page(
        &self,
        filter: &str,
        binds: &[FilterBind],
        params: &ListParams,
    ) -> Result<PagedResult<Post>> {
        let sql = format!(
            "SELECT {} FROM posts {} ORDER BY COALESCE(published_at, created_at) DESC, id DESC LIMIT ? OFFSET ?",
            POST_COLUMNS, filter
        );
        let count_sql = format!("SELECT COUNT(*) FROM posts {}", filter);

        let (mut items, total) = with_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, Post>(&sql);
            let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
            for bind in binds {
                match bind {
                    FilterBind::Text(v) => {
                        query = query.bind(*v);
                        count = count.bind(*v);
                    }
                    FilterBind::Int(v) => {
                        query = query.bind(*v);
                        count = count.bind(*v);
                    }
                }
            }
            let items = query
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list posts")?;
            let total = count
                .fetch_one(conn)
                .await
                .context("Failed to count posts")?;
            (items, total)
        });
        self.attach_categories(&mut items).await?;
        Ok(PagedResult::new(items, total, params))
    }
}

enum FilterBind {
    Text(&'static str),
    Int(i64),
}

fn decode_version(row: (i64, i64, String, DateTime<Utc>)) -> Result<PostVersion> {
    let (id, post_id, snapshot, created_at) = row;
    let snapshot: Post =
        serde_json::from_str(&snapshot).context("Failed to decode post snapshot")?;
    Ok(PostVersion {
        id,
        post_id,
        snapshot,
        created_at,
    })
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let now = Utc::now();
        let id = with_pool!(self.pool, conn => {
            let mut tx = conn.begin().await.context("Failed to begin transaction")?;
            let id = sqlx::query(
                r#"
                INSERT INTO posts (title, slug, content, hero_image_id, status, published_at,
                    meta_title, meta_description, meta_image_id, impact, font_override, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.content)
            .bind(post.hero_image_id)
            .bind(post.status.as_str())
            .bind(post.published_at)
            .bind(&post.meta.title)
            .bind(&post.meta.description)
            .bind(post.meta.image_id)
            .bind(post.impact.as_str())
            .bind(&post.font_override)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to create post")?
            .insert_id();

            for category_id in &post.category_ids {
                sqlx::query("INSERT INTO post_categories (post_id, category_id) VALUES (?, ?)")
                    .bind(id)
                    .bind(*category_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to link post category")?;
            }
            tx.commit().await.context("Failed to commit post")?;
            id
        });
        Ok(Post {
            id,
            created_at: now,
            updated_at: now,
            ..post.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        self.fetch_one("id", Some(id), None).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        self.fetch_one("slug", None, Some(slug)).await
    }

    async fn list(
        &self,
        status: Option<PublishStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Post>> {
        match status {
            Some(status) => {
                self.fetch_page(
                    "WHERE status = ?",
                    &[FilterBind::Text(status.as_str())],
                    params,
                )
                .await
            }
            None => self.fetch_page("", &[], params).await,
        }
    }

    async fn list_by_category(
        &self,
        category_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>> {
        self.fetch_page(
            "WHERE status = ? AND id IN (SELECT post_id FROM post_categories WHERE category_id = ?)",
            &[
                FilterBind::Text(PublishStatus::Published.as_str()),
                FilterBind::Int(category_id),
            ],
            params,
        )
        .await
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        let now = Utc::now();
        with_pool!(self.pool, conn => {
            let mut tx = conn.begin().await.context("Failed to begin transaction")?;
            sqlx::query(
                r#"
                UPDATE posts
                SET title = ?, slug = ?, content = ?, hero_image_id = ?, status = ?, published_at = ?,
                    meta_title = ?, meta_description = ?, meta_image_id = ?, impact = ?, font_override = ?,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.content)
            .bind(post.hero_image_id)
            .bind(post.status.as_str())
            .bind(post.published_at)
            .bind(&post.meta.title)
            .bind(&post.meta.description)
            .bind(post.meta.image_id)
            .bind(post.impact.as_str())
            .bind(&post.font_override)
            .bind(now)
            .bind(post.id)
            .execute(&mut *tx)
            .await
            .context("Failed to update post")?;

            sqlx::query("DELETE FROM post_categories WHERE post_id = ?")
                .bind(post.id)
                .execute(&mut *tx)
                .await
                .context("Failed to clear post categories")?;
            for category_id in &post.category_ids {
                sqlx::query("INSERT INTO post_categories (post_id, category_id) VALUES (?, ?)")
                    .bind(post.id)
                    .bind(*category_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to link post category")?;
            }
            tx.commit().await.context("Failed to commit post")?;
        });
        Ok(Post {
            updated_at: now,
            ..post.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete post")?;
        });
        Ok(())
    }

    async fn search(&self, term: &str, limit: i64) -> Result<Vec<Post>> {
        let pattern = contains_pattern(term);
        let sql = format!(
            r#"
            SELECT {} FROM posts
            WHERE status = ?
              AND (LOWER(title) LIKE ? ESCAPE '!' OR LOWER(slug) LIKE ? ESCAPE '!'
                   OR LOWER(COALESCE(meta_title, '')) LIKE ? ESCAPE '!'
                   OR LOWER(COALESCE(meta_description, '')) LIKE ? ESCAPE '!')
            ORDER BY COALESCE(published_at, created_at) DESC, id DESC
            LIMIT ?
            "#,
            POST_COLUMNS
        );
        let mut posts = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, Post>(&sql)
                .bind(PublishStatus::Published.as_str())
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .fetch_all(conn)
                .await
                .context("Failed to search posts")?
        });
        self.attach_categories(&mut posts).await?;
        Ok(posts)
    }

    async fn save_version(&self, post: &Post) -> Result<PostVersion> {
        let now = Utc::now();
        let snapshot = serde_json::to_string(post).context("Failed to encode post snapshot")?;
        let id = with_pool!(self.pool, conn => {
            let id = sqlx::query(
                "INSERT INTO post_versions (post_id, snapshot, created_at) VALUES (?, ?, ?)",
            )
            .bind(post.id)
            .bind(&snapshot)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to save post version")?
            .insert_id();

            let ids = sqlx::query_scalar::<_, i64>(
                "SELECT id FROM post_versions WHERE post_id = ? ORDER BY id DESC LIMIT 1000 OFFSET ?",
            )
            .bind(post.id)
            .bind(MAX_POST_VERSIONS)
            .fetch_all(conn)
            .await
            .context("Failed to find stale post versions")?;
            for stale in ids {
                sqlx::query("DELETE FROM post_versions WHERE id = ?")
                    .bind(stale)
                    .execute(conn)
                    .await
                    .context("Failed to prune post versions")?;
            }
            id
        });
        Ok(PostVersion {
            id,
            post_id: post.id,
            snapshot: post.clone(),
            created_at: now,
        })
    }

    async fn list_versions(&self, post_id: i64) -> Result<Vec<PostVersion>> {
        let rows = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, (i64, i64, String, DateTime<Utc>)>(
                "SELECT id, post_id, snapshot, created_at FROM post_versions WHERE post_id = ? ORDER BY id DESC",
            )
            .bind(post_id)
            .fetch_all(conn)
            .await
            .context("Failed to list post versions")?
        });
        rows.into_iter().map(decode_version).collect()
    }

    async fn get_version(&self, version_id: i64) -> Result<Option<PostVersion>> {
        let row = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, (i64, i64, String, DateTime<Utc>)>(
                "SELECT id, post_id, snapshot, created_at FROM post_versions WHERE id = ?",
            )
            .bind(version_id)
            .fetch_optional(conn)
            .await
            .context("Failed to get post version")?
        });
        row.map(decode_version).transpose()
    }
}

#[cfg(test)]
pub(crate) fn sample_post(slug: &str, status: PublishStatus) -> Post {
    let now = Utc::now();
    Post {
        id: 0,
        title: format!("Post {}", slug),
        slug: slug.to_string(),
        content: "Hello".to_string(),
        hero_image_id: None,
        status,
        published_at: (status == PublishStatus::Published).then_some(now),
        meta: Default::default(),
        impact: Default::default(),
        font_override: "default".to_string(),
        category_ids: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}
