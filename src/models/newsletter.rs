//! Newsletter subscribers and notices

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ARCHIVE_PATH: &str = "/archive";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct NewsletterSubscriber {
    pub id: i64,
    /// Trimmed, lowercased address (unique)
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriberInput {
    pub email: String,
}

/// Email colours and call-to-action label
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(default)]
pub struct NoticeAppearance {
    pub background_color: String,
    pub text_color: String,
    pub button_color: String,
    pub button_text_color: String,
    pub cta_label: String,
}

impl Default for NoticeAppearance {
    fn default() -> Self {
        Self {
            background_color: "#ffffff".to_string(),
            text_color: "#111827".to_string(),
            button_color: "#111827".to_string(),
            button_text_color: "#ffffff".to_string(),
            cta_label: "Read now".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct NewsletterNotice {
    pub id: i64,
    pub subject: String,
    pub message: String,
    /// When set, the email links to page 1 of this episode
    pub episode_id: Option<i64>,
    /// Relative link used when no episode is selected
    pub archive_path: String,
    pub image_id: Option<i64>,
    /// Saving with this set sends the notice, after which it is cleared
    pub send_notice: bool,
    pub recipient_count: i64,
    pub sent_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    pub appearance: NoticeAppearance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Notice create/update payload.
///
/// On update, an absent field keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoticeInput {
    pub subject: Option<String>,
    pub message: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub episode_id: Option<Option<i64>>,
    pub archive_path: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub image_id: Option<Option<i64>>,
    #[serde(default)]
    pub send_notice: bool,
    pub appearance: Option<NoticeAppearance>,
}

/// Rendered email for a notice
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NoticeEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}
