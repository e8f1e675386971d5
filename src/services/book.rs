//! Book service

use crate::db::repositories::BookRepository;
use crate::models::{Book, CreateBookInput, ListParams, PagedResult, UpdateBookInput};
use crate::services::slug::slug_or_generate;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum BookServiceError {
    #[error("Book not found: {0}")]
    NotFound(String),

    #[error("Book slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct BookService {
    repo: Arc<dyn BookRepository>,
}

impl BookService {
    pub fn new(repo: Arc<dyn BookRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: CreateBookInput) -> Result<Book, BookServiceError> {
        let title = required_title(&input.title)?;
        let slug = slug_or_generate(input.slug.as_deref(), &title);
        if slug.is_empty() {
            return Err(BookServiceError::ValidationError(
                "Slug cannot be empty".to_string(),
            ));
        }
        self.ensure_slug_free(&slug, None).await?;

        let now = Utc::now();
        let book = self
            .repo
            .create(&Book {
                id: 0,
                title,
                slug,
                description: input.description.filter(|d| !d.trim().is_empty()),
                created_at: now,
                updated_at: now,
            })
            .await
            .context("Failed to create book")?;
        tracing::info!("Created book {} ({})", book.title, book.id);
        Ok(book)
    }

    pub async fn get(&self, id: i64) -> Result<Book, BookServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get book")?
            .ok_or_else(|| BookServiceError::NotFound(id.to_string()))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Book, BookServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get book by slug")?
            .ok_or_else(|| BookServiceError::NotFound(slug.to_string()))
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Book>, BookServiceError> {
        Ok(self.repo.list(params).await.context("Failed to list books")?)
    }

    pub async fn update(&self, id: i64, input: UpdateBookInput) -> Result<Book, BookServiceError> {
        let mut book = self.get(id).await?;

        if let Some(title) = input.title {
            book.title = required_title(&title)?;
        }
        if let Some(slug) = input.slug {
            let slug = slug_or_generate(Some(&slug), &book.title);
            if slug.is_empty() {
                return Err(BookServiceError::ValidationError(
                    "Slug cannot be empty".to_string(),
                ));
            }
            if slug != book.slug {
                self.ensure_slug_free(&slug, Some(id)).await?;
            }
            book.slug = slug;
        }
        if let Some(description) = input.description {
            book.description = description;
        }

        Ok(self.repo.update(&book).await.context("Failed to update book")?)
    }

    /// Delete a book; its chapters are kept and lose the reference
    pub async fn delete(&self, id: i64) -> Result<(), BookServiceError> {
        self.get(id).await?;
        self.repo.delete(id).await.context("Failed to delete book")?;
        Ok(())
    }

    async fn ensure_slug_free(&self, slug: &str, own_id: Option<i64>) -> Result<(), BookServiceError> {
        match self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            Some(other) if Some(other.id) != own_id => {
                Err(BookServiceError::DuplicateSlug(slug.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn required_title(title: &str) -> Result<String, BookServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BookServiceError::ValidationError("Title is required".to_string()));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxBookRepository;
    use crate::db::{create_test_pool, migrations};

    async fn service() -> BookService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        BookService::new(SqlxBookRepository::boxed(pool))
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let service = service().await;
        let book = service
            .create(CreateBookInput {
                title: "Book One: The Descent".to_string(),
                slug: None,
                description: Some("  ".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(book.slug, "book-one-the-descent");
        assert!(book.description.is_none());

        let updated = service
            .update(
                book.id,
                UpdateBookInput {
                    description: Some(Some("First arc".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("First arc"));

        let cleared = service
            .update(
                book.id,
                UpdateBookInput {
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.description.is_none());
    }

    #[tokio::test]
    async fn test_slug_is_unique() {
        let service = service().await;
        let input = || CreateBookInput {
            title: "Book One".to_string(),
            slug: None,
            description: None,
        };
        service.create(input()).await.unwrap();
        assert!(matches!(
            service.create(input()).await,
            Err(BookServiceError::DuplicateSlug(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_book() {
        let service = service().await;
        assert!(matches!(
            service.delete(42).await,
            Err(BookServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_slug_without_letters() {
        let service = service().await;
        let book = service
            .create(CreateBookInput {
                title: "Book One".to_string(),
                slug: None,
                description: None,
            })
            .await
            .unwrap();
        let result = service
            .update(
                book.id,
                UpdateBookInput {
                    slug: Some("!!".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(BookServiceError::ValidationError(_))));
    }
}
