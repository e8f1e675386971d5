//! Data models
//!
//! Database entities for every collection, the global documents, and the
//! create/update inputs accepted by the admin API.

mod book;
mod category;
mod chapter;
mod episode;
pub mod globals;
mod link;
mod media;
mod newsletter;
mod page;
mod pagination;
mod post;
mod session;
mod social_link;
mod user;

pub use book::{Book, CreateBookInput, UpdateBookInput};
pub use category::{Category, CreateCategoryInput, UpdateCategoryInput};
pub use chapter::{Chapter, CreateChapterInput, UpdateChapterInput};
pub use episode::{
    CreateEpisodeInput, Episode, EpisodePage, EpisodePageInput, EpisodeSort, EpisodeWithPages,
    UpdateEpisodeInput,
};
pub use globals::{Font, Footer, GlobalDocument, Header, SiteSettings};
pub use link::{normalize_href, Link, LinkAppearance, LinkReference, LinkRelation, LinkType};
pub use media::{CreateMediaInput, Media, UpdateMediaInput};
pub use newsletter::{
    NewsletterNotice, NewsletterSubscriber, NoticeAppearance, NoticeEmail, NoticeInput,
    SubscriberInput, DEFAULT_ARCHIVE_PATH,
};
pub use page::{
    page_path, Block, CreatePageInput, Hero, NewsletterSignupBlock, Page, PageRow, PageVersion,
    UpdatePageInput, HOME_SLUG, MAX_HERO_LINKS,
};
pub use pagination::{ListParams, PagedResult};
pub use post::{CreatePostInput, Impact, Post, PostVersion, PublishStatus, SeoMeta, UpdatePostInput};
pub use session::Session;
pub use social_link::{CreateSocialLinkInput, Platform, SocialLink, UpdateSocialLinkInput};
pub use user::{CreateUserInput, UpdateUserInput, User};

#[cfg(test)]
pub(crate) use media::sample_media;

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: a missing key stays `None`, an explicit `null`
/// becomes `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}
