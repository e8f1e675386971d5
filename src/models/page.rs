//! Page model
//!
//! Free-form pages built from a hero and an ordered list of layout blocks.
//! The hero links and the layout are stored as JSON text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::link::Link;
use super::post::{Impact, PublishStatus, SeoMeta};

/// Slug of the page rendered at `/`
pub const HOME_SLUG: &str = "home";

/// Maximum number of hero links
pub const MAX_HERO_LINKS: usize = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Hero {
    #[serde(rename = "type")]
    pub hero_type: Impact,
    /// Markdown
    pub rich_text: Option<String>,
    /// Required for high and medium impact heroes
    pub media_id: Option<i64>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "block_type", rename_all = "camelCase")]
pub enum Block {
    Content {
        /// Markdown
        #[serde(default)]
        rich_text: String,
    },
    MediaBlock {
        media_id: i64,
    },
    CallToAction {
        #[serde(default)]
        rich_text: Option<String>,
        #[serde(default)]
        links: Vec<Link>,
    },
    NewsletterSignup(NewsletterSignupBlock),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionWidth {
    #[default]
    Default,
    Narrow,
    Wide,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormLayout {
    #[default]
    Row,
    Stacked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    Compact,
    #[default]
    Default,
    Spacious,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerStyle {
    #[default]
    Rounded,
    Pill,
    Square,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignupLayout {
    pub section_width: SectionWidth,
    pub text_alignment: TextAlignment,
    pub form_layout: FormLayout,
    pub padding: Padding,
    pub corner_style: CornerStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignupLabels {
    pub email_placeholder: String,
    pub submit_label: String,
    pub submitting_label: String,
    pub success_message: String,
    pub error_message: String,
}

impl Default for SignupLabels {
    fn default() -> Self {
        Self {
            email_placeholder: "you@example.com".to_string(),
            submit_label: "Notify Me".to_string(),
            submitting_label: "Submitting...".to_string(),
            success_message: "Subscribed successfully.".to_string(),
            error_message: "Something went wrong. Please try again.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackgroundStyle {
    pub show_overlay: bool,
    pub overlay_color: Option<String>,
    /// Percentage, clamped to 0..=90 when rendered
    pub overlay_opacity: u8,
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self {
            show_overlay: true,
            overlay_color: None,
            overlay_opacity: 30,
        }
    }
}

impl BackgroundStyle {
    pub const MAX_OPACITY: u8 = 90;

    pub fn effective_opacity(&self) -> u8 {
        self.overlay_opacity.min(Self::MAX_OPACITY)
    }
}

/// Optional colour overrides; unset values fall back to the theme
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignupColors {
    pub card_background: Option<String>,
    pub text: Option<String>,
    pub muted_text: Option<String>,
    pub border: Option<String>,
    pub input_background: Option<String>,
    pub input_text: Option<String>,
    pub input_border: Option<String>,
    pub button_background: Option<String>,
    pub button_text: Option<String>,
    pub success: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NewsletterSignupBlock {
    pub heading: String,
    pub description: String,
    pub labels: SignupLabels,
    pub layout: SignupLayout,
    pub background_media_id: Option<i64>,
    pub background_style: BackgroundStyle,
    pub colors: SignupColors,
}

impl Default for NewsletterSignupBlock {
    fn default() -> Self {
        Self {
            heading: "Newsletter".to_string(),
            description: "Get notified when a new episode drops.".to_string(),
            labels: SignupLabels::default(),
            layout: SignupLayout::default(),
            background_media_id: None,
            background_style: BackgroundStyle::default(),
            colors: SignupColors::default(),
        }
    }
}

/// Raw row; `hero_links` and `layout` are JSON text
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PageRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub hero_type: String,
    pub hero_rich_text: Option<String>,
    pub hero_media_id: Option<i64>,
    pub hero_links: String,
    pub layout: String,
    #[sqlx(flatten)]
    pub meta: SeoMeta,
    pub font_override: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub hero: Hero,
    pub layout: Vec<Block>,
    pub meta: SeoMeta,
    pub font_override: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn is_published(&self) -> bool {
        self.status == PublishStatus::Published
    }

    /// Public path; the home page lives at `/`
    pub fn path(&self) -> String {
        page_path(&self.slug)
    }
}

pub fn page_path(slug: &str) -> String {
    if slug == HOME_SLUG {
        "/".to_string()
    } else {
        format!("/{}", slug)
    }
}

impl TryFrom<PageRow> for Page {
    type Error = anyhow::Error;

    fn try_from(row: PageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            status: PublishStatus::try_from(row.status).map_err(anyhow::Error::msg)?,
            published_at: row.published_at,
            hero: Hero {
                hero_type: Impact::try_from(row.hero_type).map_err(anyhow::Error::msg)?,
                rich_text: row.hero_rich_text,
                media_id: row.hero_media_id,
                links: serde_json::from_str(&row.hero_links)?,
            },
            layout: serde_json::from_str(&row.layout)?,
            meta: row.meta,
            font_override: row.font_override,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePageInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hero: Hero,
    #[serde(default)]
    pub layout: Vec<Block>,
    #[serde(default)]
    pub meta: SeoMeta,
    #[serde(default)]
    pub font_override: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePageInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub status: Option<PublishStatus>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub published_at: Option<Option<DateTime<Utc>>>,
    pub hero: Option<Hero>,
    pub layout: Option<Vec<Block>>,
    pub meta: Option<SeoMeta>,
    pub font_override: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageVersion {
    pub id: i64,
    pub page_id: i64,
    pub snapshot: Page,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newsletter_block_defaults() {
        let block: Block = serde_json::from_str(r#"{"block_type": "newsletterSignup"}"#).unwrap();
        let Block::NewsletterSignup(signup) = block else {
            panic!("expected newsletter block");
        };
        assert_eq!(signup.heading, "Newsletter");
        assert_eq!(signup.description, "Get notified when a new episode drops.");
        assert_eq!(signup.labels.submit_label, "Notify Me");
        assert_eq!(signup.labels.submitting_label, "Submitting...");
        assert!(signup.background_style.show_overlay);
        assert_eq!(signup.background_style.overlay_opacity, 30);
        assert_eq!(signup.layout.corner_style, CornerStyle::Rounded);
    }

    #[test]
    fn test_overlay_opacity_is_capped() {
        let style = BackgroundStyle {
            overlay_opacity: 100,
            ..BackgroundStyle::default()
        };
        assert_eq!(style.effective_opacity(), 90);
    }

    #[test]
    fn test_block_tags() {
        let blocks = vec![
            Block::Content {
                rich_text: "# Hi".to_string(),
            },
            Block::MediaBlock { media_id: 3 },
        ];
        let json = serde_json::to_value(&blocks).unwrap();
        assert_eq!(json[0]["block_type"], "content");
        assert_eq!(json[1]["block_type"], "mediaBlock");
    }

    #[test]
    fn test_page_paths() {
        assert_eq!(page_path("home"), "/");
        assert_eq!(page_path("about"), "/about");
    }
}
