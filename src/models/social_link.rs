//! Social link model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
    Youtube,
    Twitter,
    Threads,
    Bluesky,
    Facebook,
    Patreon,
    Discord,
    #[default]
    Other,
}

impl Platform {
    pub const ALL: [Platform; 10] = [
        Platform::Instagram,
        Platform::Tiktok,
        Platform::Youtube,
        Platform::Twitter,
        Platform::Threads,
        Platform::Bluesky,
        Platform::Facebook,
        Platform::Patreon,
        Platform::Discord,
        Platform::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Youtube => "youtube",
            Platform::Twitter => "twitter",
            Platform::Threads => "threads",
            Platform::Bluesky => "bluesky",
            Platform::Facebook => "facebook",
            Platform::Patreon => "patreon",
            Platform::Discord => "discord",
            Platform::Other => "other",
        }
    }

    /// Label shown in the footer
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::Tiktok => "TikTok",
            Platform::Youtube => "YouTube",
            Platform::Twitter => "X / Twitter",
            Platform::Threads => "Threads",
            Platform::Bluesky => "Bluesky",
            Platform::Facebook => "Facebook",
            Platform::Patreon => "Patreon",
            Platform::Discord => "Discord",
            Platform::Other => "Other",
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == value)
            .ok_or_else(|| format!("Invalid platform: {}", value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct SocialLink {
    pub id: i64,
    pub label: String,
    #[sqlx(try_from = "String")]
    pub platform: Platform,
    /// Absolute http(s) URL (unique)
    pub url: String,
    /// Lower values are listed first
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSocialLinkInput {
    pub label: String,
    #[serde(default)]
    pub platform: Platform,
    pub url: String,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSocialLinkInput {
    pub label: Option<String>,
    pub platform: Option<Platform>,
    pub url: Option<String>,
    pub sort_order: Option<i64>,
}
