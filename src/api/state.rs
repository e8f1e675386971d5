//! Application state wiring
//!
//! Builds every repository and service from the configuration and a
//! database pool.

use anyhow::Result;
use std::sync::Arc;

use crate::api::middleware::AppState;
use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxBookRepository, SqlxCategoryRepository, SqlxChapterRepository, SqlxEpisodeRepository,
    SqlxGlobalsRepository, SqlxMediaRepository, SqlxNoticeRepository, SqlxPageRepository,
    SqlxPostRepository, SqlxSessionRepository, SqlxSocialLinkRepository,
    SqlxSubscriberRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    BookService, CategoryService, ChapterService, EpisodeService, GlobalsService,
    LoginRateLimiter, Mailer, MediaService, NewsletterService, PageService, PostService,
    Revalidator, SearchService, SocialLinkService, UserService,
};
use crate::theme::ThemeEngine;

impl AppState {
    /// Wire the application with the mailer chosen by the configuration
    pub async fn from_config(config: Config, pool: DynDatabasePool) -> Result<Self> {
        Self::build(config, pool, None).await
    }

    /// Wire the application, optionally replacing the configured mailer
    pub async fn build(
        config: Config,
        pool: DynDatabasePool,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Result<Self> {
        let cache = create_cache(&config.cache).await?;
        let revalidator = Arc::new(Revalidator::new(
            cache.clone(),
            &config.site,
            &config.revalidation,
        ));

        let book_repo = SqlxBookRepository::boxed(pool.clone());
        let chapter_repo = SqlxChapterRepository::boxed(pool.clone());
        let episode_repo = SqlxEpisodeRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());

        let media_service = Arc::new(MediaService::new(
            SqlxMediaRepository::boxed(pool.clone()),
            config.upload.clone(),
            config.media.cloudinary_cloud_name.clone(),
        ));
        let user_service = Arc::new(UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
        ));
        let book_service = Arc::new(BookService::new(book_repo.clone()));
        let chapter_service = Arc::new(ChapterService::new(chapter_repo.clone(), book_repo));
        let episode_service = Arc::new(EpisodeService::new(
            episode_repo.clone(),
            chapter_repo,
            media_service.clone(),
            cache.clone(),
            revalidator.clone(),
        ));
        let category_service = Arc::new(CategoryService::new(
            category_repo.clone(),
            revalidator.clone(),
        ));
        let post_service = Arc::new(PostService::new(
            post_repo.clone(),
            category_repo,
            revalidator.clone(),
        ));
        let page_service = Arc::new(PageService::new(
            SqlxPageRepository::boxed(pool.clone()),
            revalidator.clone(),
        ));
        let social_link_service = Arc::new(SocialLinkService::new(
            SqlxSocialLinkRepository::boxed(pool.clone()),
            cache.clone(),
            revalidator.clone(),
        ));

        let mut newsletter_service = NewsletterService::new(
            SqlxSubscriberRepository::boxed(pool.clone()),
            SqlxNoticeRepository::boxed(pool.clone()),
            episode_repo.clone(),
            media_service.clone(),
            config.newsletter.clone(),
            &config.site.server_url,
        );
        if let Some(mailer) = mailer {
            newsletter_service = newsletter_service.with_mailer(mailer);
        }

        let globals_service = Arc::new(GlobalsService::new(
            SqlxGlobalsRepository::boxed(pool.clone()),
            media_service.clone(),
            cache.clone(),
            revalidator.clone(),
            &config.site.server_url,
        ));
        let search_service = Arc::new(SearchService::new(
            episode_repo,
            post_repo,
            media_service.clone(),
        ));

        let theme_engine = Arc::new(ThemeEngine::new()?);

        Ok(Self {
            config: Arc::new(config),
            cache,
            revalidator,
            user_service,
            book_service,
            chapter_service,
            episode_service,
            category_service,
            post_service,
            page_service,
            social_link_service,
            newsletter_service: Arc::new(newsletter_service),
            media_service,
            globals_service,
            search_service,
            theme_engine,
            rate_limiter: Arc::new(LoginRateLimiter::new()),
        })
    }
}
