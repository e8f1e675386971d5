//! Post model
//!
//! Blog-style news posts with draft/publish status, category links and
//! SEO metadata. Content is Markdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication status shared by posts and pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Published => "published",
        }
    }
}

impl TryFrom<String> for PublishStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "draft" => Ok(PublishStatus::Draft),
            "published" => Ok(PublishStatus::Published),
            other => Err(format!("Invalid publish status: {}", other)),
        }
    }
}

/// Hero treatment for a post or page header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Impact {
    None,
    HighImpact,
    MediumImpact,
    #[default]
    LowImpact,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::None => "none",
            Impact::HighImpact => "highImpact",
            Impact::MediumImpact => "mediumImpact",
            Impact::LowImpact => "lowImpact",
        }
    }

    /// High and medium heroes are built around an image
    pub fn requires_media(&self) -> bool {
        matches!(self, Impact::HighImpact | Impact::MediumImpact)
    }
}

impl TryFrom<String> for Impact {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "none" => Ok(Impact::None),
            "highImpact" => Ok(Impact::HighImpact),
            "mediumImpact" => Ok(Impact::MediumImpact),
            "lowImpact" => Ok(Impact::LowImpact),
            other => Err(format!("Invalid impact: {}", other)),
        }
    }
}

/// SEO metadata stored in `meta_*` columns
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct SeoMeta {
    #[sqlx(rename = "meta_title")]
    #[serde(default)]
    pub title: Option<String>,
    #[sqlx(rename = "meta_description")]
    #[serde(default)]
    pub description: Option<String>,
    #[sqlx(rename = "meta_image_id")]
    #[serde(default)]
    pub image_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    /// Markdown body
    pub content: String,
    pub hero_image_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    pub meta: SeoMeta,
    #[sqlx(try_from = "String")]
    pub impact: Impact,
    /// Font key, or `default` to use the site font
    pub font_override: String,
    /// Filled from `post_categories` after loading the row
    #[sqlx(skip)]
    #[serde(default)]
    pub category_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PublishStatus::Published
    }

    /// Public path of the post
    pub fn path(&self) -> String {
        format!("/posts/{}", self.slug)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub hero_image_id: Option<i64>,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    #[serde(default)]
    pub meta: SeoMeta,
    #[serde(default)]
    pub impact: Impact,
    #[serde(default)]
    pub font_override: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub hero_image_id: Option<Option<i64>>,
    pub status: Option<PublishStatus>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub published_at: Option<Option<DateTime<Utc>>>,
    pub category_ids: Option<Vec<i64>>,
    pub meta: Option<SeoMeta>,
    pub impact: Option<Impact>,
    pub font_override: Option<String>,
}

/// Stored snapshot of a post taken before an update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostVersion {
    pub id: i64,
    pub post_id: i64,
    pub snapshot: Post,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_names_match_stored_values() {
        for impact in [
            Impact::None,
            Impact::HighImpact,
            Impact::MediumImpact,
            Impact::LowImpact,
        ] {
            let json = serde_json::to_string(&impact).unwrap();
            assert_eq!(json, format!("\"{}\"", impact.as_str()));
            assert_eq!(Impact::try_from(impact.as_str().to_string()).unwrap(), impact);
        }
    }

    #[test]
    fn test_impact_media_requirement() {
        assert!(Impact::HighImpact.requires_media());
        assert!(Impact::MediumImpact.requires_media());
        assert!(!Impact::LowImpact.requires_media());
        assert!(!Impact::None.requires_media());
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(PublishStatus::try_from("archived".to_string()).is_err());
        assert_eq!(
            PublishStatus::try_from("published".to_string()).unwrap(),
            PublishStatus::Published
        );
    }
}
