//! Database repositories
//!
//! One repository per collection. Each is a trait plus an sqlx
//! implementation that works against either configured driver.

pub mod book;
pub mod category;
pub mod chapter;
pub mod episode;
pub mod globals;
pub mod media;
pub mod newsletter;
pub mod page;
pub mod post;
pub mod session;
pub mod social_link;
pub mod user;

pub use book::{BookRepository, SqlxBookRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use chapter::{ChapterRepository, SqlxChapterRepository};
pub use episode::{EpisodeRepository, SqlxEpisodeRepository};
pub use globals::{load_global, save_global, GlobalsRepository, SqlxGlobalsRepository};
pub use media::{MediaRepository, SqlxMediaRepository};
pub use newsletter::{
    NoticeRepository, SqlxNoticeRepository, SqlxSubscriberRepository, SubscriberRepository,
};
pub use page::{PageRepository, SqlxPageRepository, MAX_PAGE_VERSIONS};
pub use post::{PostRepository, SqlxPostRepository, MAX_POST_VERSIONS};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use social_link::{SocialLinkRepository, SqlxSocialLinkRepository, MAX_SOCIAL_LINKS};
pub use user::{SqlxUserRepository, UserRepository};

/// Escape character for `LIKE` patterns. A backslash would need doubling
/// inside MySQL string literals, so both drivers use `!`.
pub(crate) const LIKE_ESCAPE: char = '!';

/// `%term%` for a case-insensitive `LIKE ... ESCAPE '!'` search, with the
/// term's own wildcards matched literally
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern(" Gate "), "%gate%");
        assert_eq!(contains_pattern("100%"), "%100!%%");
        assert_eq!(contains_pattern("a_b!"), "%a!_b!!%");
        assert_eq!(contains_pattern(""), "%%");
    }
}
