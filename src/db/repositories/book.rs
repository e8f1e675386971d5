//! Book repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{Book, ListParams, PagedResult};
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const BOOK_COLUMNS: &str = "id, title, slug, description, created_at, updated_at";

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn create(&self, book: &Book) -> Result<Book>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Book>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Book>>;

    /// Ordered by title
    async fn list(&self, params: &ListParams) -> Result<PagedResult<Book>>;

    async fn update(&self, book: &Book) -> Result<Book>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxBookRepository {
    pool: DynDatabasePool,
}

impl SqlxBookRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BookRepository for SqlxBookRepository {
    async fn create(&self, book: &Book) -> Result<Book> {
        let now = Utc::now();
        let id = with_pool!(self.pool, conn => {
            sqlx::query(
                "INSERT INTO books (title, slug, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&book.title)
            .bind(&book.slug)
            .bind(&book.description)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create book")?
            .insert_id()
        });
        Ok(Book {
            id,
            created_at: now,
            updated_at: now,
            ..book.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS);
        let book = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, Book>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get book by ID")?
        });
        Ok(book)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE slug = ?", BOOK_COLUMNS);
        let book = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, Book>(&sql)
                .bind(slug)
                .fetch_optional(conn)
                .await
                .context("Failed to get book by slug")?
        });
        Ok(book)
    }

    async fn list(&self, params: &ListParams) -> Result<PagedResult<Book>> {
        let sql = format!(
            "SELECT {} FROM books ORDER BY title ASC, id ASC LIMIT ? OFFSET ?",
            BOOK_COLUMNS
        );
        let (items, total) = with_pool!(self.pool, conn => {
            let items = sqlx::query_as::<_, Book>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list books")?;
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
                .fetch_one(conn)
                .await
                .context("Failed to count books")?;
            (items, total)
        });
        Ok(PagedResult::new(items, total, params))
    }

    async fn update(&self, book: &Book) -> Result<Book> {
        let now = Utc::now();
        with_pool!(self.pool, conn => {
            sqlx::query(
                "UPDATE books SET title = ?, slug = ?, description = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&book.title)
            .bind(&book.slug)
            .bind(&book.description)
            .bind(now)
            .bind(book.id)
            .execute(conn)
            .await
            .context("Failed to update book")?;
        });
        Ok(Book {
            updated_at: now,
            ..book.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM books WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete book")?;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    fn book(title: &str, slug: &str) -> Book {
        let now = Utc::now();
        Book {
            id: 0,
            title: title.to_string(),
            slug: slug.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_book_crud() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxBookRepository::new(pool);

        let created = repo.create(&book("Book One", "book-one")).await.unwrap();
        assert_eq!(
            repo.get_by_slug("book-one").await.unwrap().unwrap().id,
            created.id
        );

        let mut updated = created.clone();
        updated.description = Some("The first arc".to_string());
        repo.update(&updated).await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.description.as_deref(), Some("The first arc"));

        assert!(repo.create(&book("Other", "book-one")).await.is_err());

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert_eq!(repo.list(&ListParams::default()).await.unwrap().total, 0);
    }
}
