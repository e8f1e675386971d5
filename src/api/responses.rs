//! Shared API response types
//!
//! Every collection list uses [`PagedResponse`]. Service errors convert into
//! [`ApiError`] here so handlers can use `?` directly.

use serde::Serialize;

use crate::api::middleware::ApiError;
use crate::models::PagedResult;
use crate::services::{
    BookServiceError, CategoryServiceError, ChapterServiceError, EpisodeServiceError,
    GlobalsServiceError, MediaServiceError, NewsletterServiceError, PageServiceError,
    PostServiceError, SocialLinkServiceError, UserServiceError,
};

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub docs: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> From<PagedResult<T>> for PagedResponse<T> {
    fn from(result: PagedResult<T>) -> Self {
        let total_pages = result.total_pages();
        Self {
            docs: result.items,
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages,
        }
    }
}

/// Non-paginated list response
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub docs: Vec<T>,
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::internal_error(format!("{:#}", e))
    }
}

impl From<BookServiceError> for ApiError {
    fn from(e: BookServiceError) -> Self {
        match e {
            BookServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            BookServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            BookServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            BookServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<ChapterServiceError> for ApiError {
    fn from(e: ChapterServiceError) -> Self {
        match e {
            ChapterServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            ChapterServiceError::DuplicateSlug(_) | ChapterServiceError::DuplicateNumber(_) => {
                ApiError::conflict(e.to_string())
            }
            ChapterServiceError::BookNotFound(_) => ApiError::validation_error(e.to_string()),
            ChapterServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ChapterServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<EpisodeServiceError> for ApiError {
    fn from(e: EpisodeServiceError) -> Self {
        match e {
            EpisodeServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            EpisodeServiceError::DuplicateSlug(_) | EpisodeServiceError::DuplicateNumber(_) => {
                ApiError::conflict(e.to_string())
            }
            EpisodeServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            EpisodeServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            CategoryServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            CategoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CategoryServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(_) | PostServiceError::VersionNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            PostServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            PostServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            PostServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<PageServiceError> for ApiError {
    fn from(e: PageServiceError) -> Self {
        match e {
            PageServiceError::NotFound(_) | PageServiceError::VersionNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            PageServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            PageServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            PageServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<SocialLinkServiceError> for ApiError {
    fn from(e: SocialLinkServiceError) -> Self {
        match e {
            SocialLinkServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            SocialLinkServiceError::DuplicateUrl(_) => ApiError::conflict(e.to_string()),
            SocialLinkServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            SocialLinkServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<NewsletterServiceError> for ApiError {
    fn from(e: NewsletterServiceError) -> Self {
        match e {
            NewsletterServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            NewsletterServiceError::DuplicateEmail(_) => ApiError::conflict(e.to_string()),
            NewsletterServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            NewsletterServiceError::MailerUnavailable(msg) => ApiError::internal_error(msg),
            NewsletterServiceError::DeliveryFailed(msg) => ApiError::new("BAD_GATEWAY", msg),
            NewsletterServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<MediaServiceError> for ApiError {
    fn from(e: MediaServiceError) -> Self {
        match e {
            MediaServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            MediaServiceError::InUse(_) => ApiError::conflict(e.to_string()),
            MediaServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            MediaServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<GlobalsServiceError> for ApiError {
    fn from(e: GlobalsServiceError) -> Self {
        match e {
            GlobalsServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            GlobalsServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(_) => ApiError::conflict(e.to_string()),
            UserServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            UserServiceError::InternalError(_) => ApiError::internal_error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;
    use axum::http::StatusCode;

    #[test]
    fn test_paged_response_counts_pages() {
        let result = PagedResult::new(vec![1, 2], 22, &ListParams::new(3, 10));
        let response: PagedResponse<i32> = result.into();
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.page, 3);
        assert_eq!(response.docs, vec![1, 2]);
    }

    #[test]
    fn test_service_errors_map_to_statuses() {
        let conflict: ApiError = EpisodeServiceError::DuplicateNumber(4).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing: ApiError = PostServiceError::VersionNotFound(9).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let invalid: ApiError = NewsletterServiceError::ValidationError("Subject".into()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.error.message, "Subject");

        let forbidden: ApiError = UserServiceError::Forbidden("no".into()).into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }
}
