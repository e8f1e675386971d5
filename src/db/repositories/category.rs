//! Category repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{Category, ListParams, PagedResult};
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::media::placeholders;

const CATEGORY_COLUMNS: &str = "id, title, slug, created_at, updated_at";

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// Look up several categories, ordered by title
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<Category>>;

    /// Ordered by title
    async fn list(&self, params: &ListParams) -> Result<PagedResult<Category>>;

    async fn update(&self, category: &Category) -> Result<Category>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        let now = Utc::now();
        let id = with_pool!(self.pool, conn => {
            sqlx::query(
                "INSERT INTO categories (title, slug, created_at, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&category.title)
            .bind(&category.slug)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create category")?
            .insert_id()
        });
        Ok(Category {
            id,
            created_at: now,
            updated_at: now,
            ..category.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS);
        let category = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, Category>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get category by ID")?
        });
        Ok(category)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_COLUMNS);
        let category = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, Category>(&sql)
                .bind(slug)
                .fetch_optional(conn)
                .await
                .context("Failed to get category by slug")?
        });
        Ok(category)
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM categories WHERE id IN ({}) ORDER BY title ASC",
            CATEGORY_COLUMNS,
            placeholders(ids.len())
        );
        let categories = with_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, Category>(&sql);
            for id in ids {
                query = query.bind(*id);
            }
            query
                .fetch_all(conn)
                .await
                .context("Failed to load categories")?
        });
        Ok(categories)
    }

    async fn list(&self, params: &ListParams) -> Result<PagedResult<Category>> {
        let sql = format!(
            "SELECT {} FROM categories ORDER BY title ASC, id ASC LIMIT ? OFFSET ?",
            CATEGORY_COLUMNS
        );
        let (items, total) = with_pool!(self.pool, conn => {
            let items = sqlx::query_as::<_, Category>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list categories")?;
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories")
                .fetch_one(conn)
                .await
                .context("Failed to count categories")?;
            (items, total)
        });
        Ok(PagedResult::new(items, total, params))
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        let now = Utc::now();
        with_pool!(self.pool, conn => {
            sqlx::query("UPDATE categories SET title = ?, slug = ?, updated_at = ? WHERE id = ?")
                .bind(&category.title)
                .bind(&category.slug)
                .bind(now)
                .bind(category.id)
                .execute(conn)
                .await
                .context("Failed to update category")?;
        });
        Ok(Category {
            updated_at: now,
            ..category.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM categories WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete category")?;
        });
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_category(title: &str, slug: &str) -> Category {
    let now = Utc::now();
    Category {
        id: 0,
        title: title.to_string(),
        slug: slug.to_string(),
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxCategoryRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxCategoryRepository::new(pool)
    }

    #[tokio::test]
    async fn test_category_crud() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&sample_category("Announcements", "announcements"))
            .await
            .unwrap();

        let found = repo.get_by_slug("announcements").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        let mut renamed = found.clone();
        renamed.title = "News".to_string();
        repo.update(&renamed).await.unwrap();
        assert_eq!(repo.get_by_id(created.id).await.unwrap().unwrap().title, "News");

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slug_is_unique_and_list_sorted() {
        let repo = setup_test_repo().await;
        let b = repo.create(&sample_category("Behind the scenes", "bts")).await.unwrap();
        let a = repo.create(&sample_category("Art", "art")).await.unwrap();
        assert!(repo.create(&sample_category("Again", "art")).await.is_err());

        let listed = repo.list(&ListParams::default()).await.unwrap();
        let titles: Vec<&str> = listed.items.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Art", "Behind the scenes"]);

        let many = repo.get_many(&[b.id, a.id]).await.unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[0].id, a.id);
    }
}
