//! Chapter service
//!
//! Chapters group episodes and optionally belong to a book. Numbers are
//! unique and start at 1.

use crate::db::repositories::{BookRepository, ChapterRepository};
use crate::models::{Chapter, CreateChapterInput, ListParams, PagedResult, UpdateChapterInput};
use crate::services::slug::slug_or_generate;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ChapterServiceError {
    #[error("Chapter not found: {0}")]
    NotFound(String),

    #[error("Chapter slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Chapter number already exists: {0}")]
    DuplicateNumber(i64),

    #[error("Book not found: {0}")]
    BookNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ChapterService {
    repo: Arc<dyn ChapterRepository>,
    book_repo: Arc<dyn BookRepository>,
}

impl ChapterService {
    pub fn new(repo: Arc<dyn ChapterRepository>, book_repo: Arc<dyn BookRepository>) -> Self {
        Self { repo, book_repo }
    }

    pub async fn create(&self, input: CreateChapterInput) -> Result<Chapter, ChapterServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ChapterServiceError::ValidationError(
                "Title is required".to_string(),
            ));
        }
        validate_number(input.chapter_number)?;
        let slug = slug_or_generate(input.slug.as_deref(), &title);
        if slug.is_empty() {
            return Err(ChapterServiceError::ValidationError(
                "Slug cannot be empty".to_string(),
            ));
        }

        self.ensure_number_free(input.chapter_number, None).await?;
        self.ensure_slug_free(&slug, None).await?;
        if let Some(book_id) = input.book_id {
            self.ensure_book_exists(book_id).await?;
        }

        let now = Utc::now();
        Ok(self
            .repo
            .create(&Chapter {
                id: 0,
                title,
                slug,
                chapter_number: input.chapter_number,
                description: input.description.filter(|d| !d.trim().is_empty()),
                book_id: input.book_id,
                created_at: now,
                updated_at: now,
            })
            .await
            .context("Failed to create chapter")?)
    }

    pub async fn get(&self, id: i64) -> Result<Chapter, ChapterServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get chapter")?
            .ok_or_else(|| ChapterServiceError::NotFound(id.to_string()))
    }

    /// Chapters ordered by number, optionally limited to one book
    pub async fn list(
        &self,
        book_id: Option<i64>,
        params: &ListParams,
    ) -> Result<PagedResult<Chapter>, ChapterServiceError> {
        Ok(self
            .repo
            .list(book_id, params)
            .await
            .context("Failed to list chapters")?)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateChapterInput,
    ) -> Result<Chapter, ChapterServiceError> {
        let mut chapter = self.get(id).await?;

        if let Some(title) = input.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ChapterServiceError::ValidationError(
                    "Title is required".to_string(),
                ));
            }
            chapter.title = title.to_string();
        }
        if let Some(number) = input.chapter_number {
            validate_number(number)?;
            if number != chapter.chapter_number {
                self.ensure_number_free(number, Some(id)).await?;
            }
            chapter.chapter_number = number;
        }
        if let Some(slug) = input.slug {
            let slug = slug_or_generate(Some(&slug), &chapter.title);
            if slug.is_empty() {
                return Err(ChapterServiceError::ValidationError(
                    "Slug cannot be empty".to_string(),
                ));
            }
            if slug != chapter.slug {
                self.ensure_slug_free(&slug, Some(id)).await?;
            }
            chapter.slug = slug;
        }
        if let Some(description) = input.description {
            chapter.description = description;
        }
        if let Some(book_id) = input.book_id {
            if let Some(book_id) = book_id {
                self.ensure_book_exists(book_id).await?;
            }
            chapter.book_id = book_id;
        }

        Ok(self
            .repo
            .update(&chapter)
            .await
            .context("Failed to update chapter")?)
    }

    /// Delete a chapter; its episodes are kept and lose the reference
    pub async fn delete(&self, id: i64) -> Result<(), ChapterServiceError> {
        self.get(id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete chapter")?;
        Ok(())
    }

    async fn ensure_number_free(
        &self,
        number: i64,
        own_id: Option<i64>,
    ) -> Result<(), ChapterServiceError> {
        match self
            .repo
            .get_by_number(number)
            .await
            .context("Failed to check chapter number")?
        {
            Some(other) if Some(other.id) != own_id => {
                Err(ChapterServiceError::DuplicateNumber(number))
            }
            _ => Ok(()),
        }
    }

    async fn ensure_slug_free(
        &self,
        slug: &str,
        own_id: Option<i64>,
    ) -> Result<(), ChapterServiceError> {
        match self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            Some(other) if Some(other.id) != own_id => {
                Err(ChapterServiceError::DuplicateSlug(slug.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn ensure_book_exists(&self, book_id: i64) -> Result<(), ChapterServiceError> {
        self.book_repo
            .get_by_id(book_id)
            .await
            .context("Failed to get book")?
            .map(|_| ())
            .ok_or(ChapterServiceError::BookNotFound(book_id))
    }
}

fn validate_number(number: i64) -> Result<(), ChapterServiceError> {
    if number < 1 {
        return Err(ChapterServiceError::ValidationError(
            "Chapter number must be at least 1".to_string(),
        ));
    }
    Ok(())
}
