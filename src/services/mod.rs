//! Services layer - Business logic
//!
//! Each collection has a service that validates input, talks to its
//! repository and publishes cache revalidation after writes. Services never
//! touch HTTP types.

pub mod book;
pub mod category;
pub mod chapter;
pub mod email;
pub mod episode;
pub mod globals;
pub mod markdown;
pub mod media;
pub mod newsletter;
pub mod page;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod revalidation;
pub mod search;
pub mod slug;
pub mod social_link;
pub mod user;
pub mod validation;

pub use book::{BookService, BookServiceError};
pub use category::{CategoryService, CategoryServiceError};
pub use chapter::{ChapterService, ChapterServiceError};
pub use email::{create_mailer, Mailer, OutgoingEmail};
pub use episode::{EpisodeCard, EpisodeService, EpisodeServiceError};
pub use globals::{build_tab_title, GlobalsService, GlobalsServiceError};
pub use markdown::MarkdownRenderer;
pub use media::{MediaService, MediaServiceError};
pub use newsletter::{NewsletterService, NewsletterServiceError, SubscribeOutcome};
pub use page::{PageService, PageServiceError};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use revalidation::{MutationContext, Revalidator};
pub use search::{SearchResult, SearchService};
pub use slug::generate_slug;
pub use social_link::{SocialLinkService, SocialLinkServiceError};
pub use user::{UserService, UserServiceError};
