//! View models for the page templates
//!
//! Plain data built by the frontend handlers. Everything here is already
//! resolved (hrefs, image URLs, rendered Markdown) so templates only print.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{NewsletterSignupBlock, PagedResult};
use crate::services::EpisodeCard;

use super::NavLink;

/// "October 3, 2026"
pub fn format_publish_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ArchiveCard {
    pub href: String,
    pub thumbnail_url: String,
    pub thumbnail_alt: String,
    pub number_label: String,
    pub title: String,
    pub published: String,
}

impl From<&EpisodeCard> for ArchiveCard {
    fn from(card: &EpisodeCard) -> Self {
        Self {
            href: card.reader_path(),
            thumbnail_url: card.thumbnail_url.clone(),
            thumbnail_alt: card.thumbnail_alt.clone(),
            number_label: format!("Episode {}", card.episode_number),
            title: card.title.clone(),
            published: format!("Published {}", format_publish_date(&card.publish_date)),
        }
    }
}

/// Reader button; a missing href renders it disabled
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NavButton {
    pub label: &'static str,
    pub href: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReaderNav {
    pub prev: NavButton,
    pub next: NavButton,
}

/// Previous/next buttons for page `page` of `page_count`
pub fn reader_nav(slug: &str, page: usize, page_count: usize, next_episode: Option<&str>) -> ReaderNav {
    let prev = if page > 1 {
        NavButton {
            label: "Previous Page",
            href: Some(format!("/episode/{}/{}", slug, page - 1)),
        }
    } else {
        NavButton {
            label: "Back to Archive",
            href: Some("/archive".to_string()),
        }
    };

    let next = if page < page_count {
        NavButton {
            label: "Next Page",
            href: Some(format!("/episode/{}/{}", slug, page + 1)),
        }
    } else {
        NavButton {
            label: "Next Episode",
            href: next_episode
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("/episode/{}/1", s)),
        }
    };

    ReaderNav { prev, next }
}

/// Page alt text, falling back to `"{title} page {n}"`
pub fn page_alt(alt_text: Option<&str>, title: &str, page: usize) -> String {
    alt_text
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} page {}", title, page))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostCard {
    pub title: String,
    pub href: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Pagination {
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub pages: Vec<PageLink>,
}

/// `/posts` for the first page, `/posts/page/{n}` after that
pub fn posts_page_href(page: u32) -> String {
    if page <= 1 {
        "/posts".to_string()
    } else {
        format!("/posts/page/{}", page)
    }
}

/// Pagination links; `None` when everything fits on one page
pub fn pagination(page: u32, total_pages: u32) -> Option<Pagination> {
    if total_pages <= 1 {
        return None;
    }
    Some(Pagination {
        prev_href: (page > 1).then(|| posts_page_href(page - 1)),
        next_href: (page < total_pages).then(|| posts_page_href(page + 1)),
        pages: (1..=total_pages)
            .map(|number| PageLink {
                number,
                href: posts_page_href(number),
                current: number == page,
            })
            .collect(),
    })
}

/// "Showing X - Y of Z Posts", `None` on an empty page
pub fn range_line<T>(result: &PagedResult<T>) -> Option<String> {
    result
        .item_range()
        .map(|(start, end)| format!("Showing {} - {} of {} Posts", start, end, result.total))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeroView {
    /// `none`, `highImpact`, `mediumImpact` or `lowImpact`
    pub kind: &'static str,
    pub title: Option<String>,
    pub html: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: String,
    pub links: Vec<NavLink>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SignupView {
    #[serde(flatten)]
    pub block: NewsletterSignupBlock,
    pub background_url: Option<String>,
    /// 0.0..=0.9
    pub overlay_opacity: f32,
}

impl SignupView {
    pub fn new(block: NewsletterSignupBlock, background_url: Option<String>) -> Self {
        let overlay_opacity = f32::from(block.background_style.effective_opacity()) / 100.0;
        Self {
            block,
            background_url,
            overlay_opacity,
        }
    }
}

/// One layout block, ready for `page.html`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderedBlock {
    Content {
        html: String,
    },
    Media {
        url: String,
        alt: String,
        caption_html: Option<String>,
    },
    CallToAction {
        html: Option<String>,
        links: Vec<NavLink>,
    },
    NewsletterSignup(SignupView),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;
    use chrono::TimeZone;

    #[test]
    fn test_format_publish_date() {
        let date = Utc.with_ymd_and_hms(2026, 3, 7, 18, 0, 0).unwrap();
        assert_eq!(format_publish_date(&date), "March 7, 2026");
    }

    #[test]
    fn test_archive_card_labels() {
        let card = EpisodeCard {
            id: 1,
            title: "The Gate".to_string(),
            slug: "the-gate".to_string(),
            episode_number: 12,
            publish_date: Utc.with_ymd_and_hms(2025, 11, 30, 0, 0, 0).unwrap(),
            thumbnail_url: "/placeholder-thumbnail.jpg".to_string(),
            thumbnail_alt: "The Gate thumbnail".to_string(),
        };
        let view = ArchiveCard::from(&card);
        assert_eq!(view.href, "/episode/the-gate/1");
        assert_eq!(view.number_label, "Episode 12");
        assert_eq!(view.published, "Published November 30, 2025");
    }

    #[test]
    fn test_reader_nav_first_middle_last() {
        let first = reader_nav("ep", 1, 3, None);
        assert_eq!(first.prev.label, "Back to Archive");
        assert_eq!(first.prev.href.as_deref(), Some("/archive"));
        assert_eq!(first.next.href.as_deref(), Some("/episode/ep/2"));

        let middle = reader_nav("ep", 2, 3, None);
        assert_eq!(middle.prev.label, "Previous Page");
        assert_eq!(middle.prev.href.as_deref(), Some("/episode/ep/1"));
        assert_eq!(middle.next.label, "Next Page");

        let last = reader_nav("ep", 3, 3, Some("ep-2"));
        assert_eq!(last.next.label, "Next Episode");
        assert_eq!(last.next.href.as_deref(), Some("/episode/ep-2/1"));

        let final_episode = reader_nav("ep", 3, 3, None);
        assert_eq!(final_episode.next.label, "Next Episode");
        assert_eq!(final_episode.next.href, None);
    }

    #[test]
    fn test_page_alt_fallback() {
        assert_eq!(page_alt(Some("A dragon"), "Ep", 2), "A dragon");
        assert_eq!(page_alt(Some("  "), "Ep", 2), "Ep page 2");
        assert_eq!(page_alt(None, "Ep", 1), "Ep page 1");
    }

    #[test]
    fn test_pagination_links() {
        assert_eq!(pagination(1, 1), None);

        let p = pagination(2, 3).unwrap();
        assert_eq!(p.prev_href.as_deref(), Some("/posts"));
        assert_eq!(p.next_href.as_deref(), Some("/posts/page/3"));
        assert_eq!(p.pages.len(), 3);
        assert!(p.pages[1].current);

        let last = pagination(3, 3).unwrap();
        assert_eq!(last.next_href, None);
    }

    #[test]
    fn test_range_line() {
        let page = PagedResult::new(vec![1; 12], 26, &ListParams::new(2, 12));
        assert_eq!(range_line(&page).as_deref(), Some("Showing 13 - 24 of 26 Posts"));

        let last = PagedResult::new(vec![1; 2], 26, &ListParams::new(3, 12));
        assert_eq!(range_line(&last).as_deref(), Some("Showing 25 - 26 of 26 Posts"));

        let empty: PagedResult<i32> = PagedResult::new(vec![], 0, &ListParams::new(1, 12));
        assert_eq!(range_line(&empty), None);
    }

    #[test]
    fn test_signup_overlay_is_clamped() {
        let mut block = NewsletterSignupBlock::default();
        block.background_style.overlay_opacity = 100;
        let view = SignupView::new(block, None);
        assert!((view.overlay_opacity - 0.9).abs() < f32::EPSILON);
    }
}
