//! Media model
//!
//! Uploaded images. Files are stored on local disk and served from
//! `/uploads/<filename>`. An optional Cloudinary public id enables
//! transformed delivery URLs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Media {
    pub id: i64,
    /// Alternative text (required)
    pub alt: String,
    /// Markdown caption
    pub caption: Option<String>,
    /// Stored file name
    pub filename: String,
    pub mime_type: String,
    pub filesize: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    /// Served path, e.g. `/uploads/3f2a.png`
    pub url: String,
    pub cloudinary_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Media {
    /// Public id used to build Cloudinary URLs.
    ///
    /// The explicit id wins; otherwise the stored file name without its
    /// extension.
    pub fn public_id(&self) -> Option<String> {
        if let Some(id) = self
            .cloudinary_public_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            return Some(id.to_string());
        }

        let stem = match self.filename.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => self.filename.as_str(),
        };
        let stem = stem.trim();
        if stem.is_empty() {
            None
        } else {
            Some(stem.to_string())
        }
    }
}

/// Metadata for a new upload; the file itself arrives separately
#[derive(Debug, Clone)]
pub struct CreateMediaInput {
    pub alt: String,
    pub caption: Option<String>,
    pub filename: String,
    pub mime_type: String,
    pub filesize: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub url: String,
    pub cloudinary_public_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMediaInput {
    pub alt: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub caption: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub cloudinary_public_id: Option<Option<String>>,
}

#[cfg(test)]
pub(crate) fn sample_media(id: i64, filename: &str) -> Media {
    let now = Utc::now();
    Media {
        id,
        alt: format!("media {}", id),
        caption: None,
        filename: filename.to_string(),
        mime_type: "image/png".to_string(),
        filesize: 1024,
        width: Some(600),
        height: Some(840),
        url: format!("/uploads/{}", filename),
        cloudinary_public_id: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_id_prefers_explicit_value() {
        let mut media = sample_media(1, "page-01.png");
        media.cloudinary_public_id = Some(" comics/ep1/page-01 ".to_string());
        assert_eq!(media.public_id().as_deref(), Some("comics/ep1/page-01"));
    }

    #[test]
    fn test_public_id_strips_extension() {
        let media = sample_media(1, "cover.final.jpg");
        assert_eq!(media.public_id().as_deref(), Some("cover.final"));
    }

    #[test]
    fn test_public_id_without_extension_or_name() {
        assert_eq!(sample_media(1, "cover").public_id().as_deref(), Some("cover"));
        assert_eq!(sample_media(1, ".png").public_id(), None);
    }
}
