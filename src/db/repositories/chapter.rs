//! Chapter repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{Chapter, ListParams, PagedResult};
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const CHAPTER_COLUMNS: &str =
    "id, title, slug, chapter_number, description, book_id, created_at, updated_at";

#[async_trait]
pub trait ChapterRepository: Send + Sync {
    async fn create(&self, chapter: &Chapter) -> Result<Chapter>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Chapter>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Chapter>>;

    async fn get_by_number(&self, chapter_number: i64) -> Result<Option<Chapter>>;

    /// Ordered by chapter number, optionally restricted to one book
    async fn list(&self, book_id: Option<i64>, params: &ListParams)
        -> Result<PagedResult<Chapter>>;

    async fn update(&self, chapter: &Chapter) -> Result<Chapter>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxChapterRepository {
    pool: DynDatabasePool,
}

impl SqlxChapterRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ChapterRepository> {
        Arc::new(Self::new(pool))
    }

    async fn get_where(&self, column: &str, value: ChapterKey<'_>) -> Result<Option<Chapter>> {
        let sql = format!(
            "SELECT {} FROM chapters WHERE {} = ?",
            CHAPTER_COLUMNS, column
        );
        let chapter = with_pool!(self.pool, conn => {
            let query = sqlx::query_as::<_, Chapter>(&sql);
            let query = match value {
                ChapterKey::Id(v) => query.bind(v),
                ChapterKey::Slug(v) => query.bind(v),
            };
            query
                .fetch_optional(conn)
                .await
                .with_context(|| format!("Failed to get chapter by {}", column))?
        });
        Ok(chapter)
    }
}

#[derive(Clone, Copy)]
enum ChapterKey<'a> {
    Id(i64),
    Slug(&'a str),
}

#[async_trait]
impl ChapterRepository for SqlxChapterRepository {
    async fn create(&self, chapter: &Chapter) -> Result<Chapter> {
        let now = Utc::now();
        let id = with_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO chapters (title, slug, chapter_number, description, book_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chapter.title)
            .bind(&chapter.slug)
            .bind(chapter.chapter_number)
            .bind(&chapter.description)
            .bind(chapter.book_id)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create chapter")?
            .insert_id()
        });
        Ok(Chapter {
            id,
            created_at: now,
            updated_at: now,
            ..chapter.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Chapter>> {
        self.get_where("id", ChapterKey::Id(id)).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Chapter>> {
        self.get_where("slug", ChapterKey::Slug(slug)).await
    }

    async fn get_by_number(&self, chapter_number: i64) -> Result<Option<Chapter>> {
        self.get_where("chapter_number", ChapterKey::Id(chapter_number))
            .await
    }

    async fn list(
        &self,
        book_id: Option<i64>,
        params: &ListParams,
    ) -> Result<PagedResult<Chapter>> {
        let filter = if book_id.is_some() {
            "WHERE book_id = ?"
        } else {
            ""
        };
        let sql = format!(
            "SELECT {} FROM chapters {} ORDER BY chapter_number ASC LIMIT ? OFFSET ?",
            CHAPTER_COLUMNS, filter
        );
        let count_sql = format!("SELECT COUNT(*) FROM chapters {}", filter);

        let (items, total) = with_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, Chapter>(&sql);
            let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
            if let Some(book_id) = book_id {
                query = query.bind(book_id);
                count = count.bind(book_id);
            }
            let items = query
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list chapters")?;
            let total = count
                .fetch_one(conn)
                .await
                .context("Failed to count chapters")?;
            (items, total)
        });
        Ok(PagedResult::new(items, total, params))
    }

    async fn update(&self, chapter: &Chapter) -> Result<Chapter> {
        let now = Utc::now();
        with_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                UPDATE chapters
                SET title = ?, slug = ?, chapter_number = ?, description = ?, book_id = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&chapter.title)
            .bind(&chapter.slug)
            .bind(chapter.chapter_number)
            .bind(&chapter.description)
            .bind(chapter.book_id)
            .bind(now)
            .bind(chapter.id)
            .execute(conn)
            .await
            .context("Failed to update chapter")?;
        });
        Ok(Chapter {
            updated_at: now,
            ..chapter.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM chapters WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete chapter")?;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{BookRepository, SqlxBookRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Book;

    fn chapter(number: i64, book_id: Option<i64>) -> Chapter {
        let now = Utc::now();
        Chapter {
            id: 0,
            title: format!("Chapter {}", number),
            slug: format!("chapter-{}", number),
            chapter_number: number,
            description: None,
            book_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_by_book_in_number_order() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let now = Utc::now();
        let book = SqlxBookRepository::new(pool.clone())
            .create(&Book {
                id: 0,
                title: "Book".to_string(),
                slug: "book".to_string(),
                description: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let repo = SqlxChapterRepository::new(pool);

        repo.create(&chapter(2, Some(book.id))).await.unwrap();
        repo.create(&chapter(1, Some(book.id))).await.unwrap();
        repo.create(&chapter(3, None)).await.unwrap();

        let in_book = repo.list(Some(book.id), &ListParams::default()).await.unwrap();
        let numbers: Vec<i64> = in_book.items.iter().map(|c| c.chapter_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(in_book.total, 2);

        let all = repo.list(None, &ListParams::default()).await.unwrap();
        assert_eq!(all.total, 3);

        assert!(repo.get_by_number(3).await.unwrap().is_some());
        assert!(repo.get_by_slug("chapter-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deleting_book_detaches_chapters() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let now = Utc::now();
        let books = SqlxBookRepository::new(pool.clone());
        let book = books
            .create(&Book {
                id: 0,
                title: "Book".to_string(),
                slug: "book".to_string(),
                description: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let repo = SqlxChapterRepository::new(pool);
        let created = repo.create(&chapter(1, Some(book.id))).await.unwrap();

        books.delete(book.id).await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(found.book_id.is_none());
    }
}
