//! Episode model
//!
//! An episode is one release of the comic: an ordered run of page images plus
//! optional author notes. Episodes are numbered, and the number is the
//! canonical reading order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Episode {
    pub id: i64,
    pub title: String,
    pub slug: String,
    /// Reading order (unique)
    pub episode_number: i64,
    pub chapter_id: Option<i64>,
    pub publish_date: DateTime<Utc>,
    /// Archive thumbnail; the first page is used when unset
    pub thumbnail_id: Option<i64>,
    /// Markdown notes shown under the reader
    pub author_notes: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Episode {
    /// Path of the first reader page
    pub fn reader_path(&self) -> String {
        format!("/episode/{}/1", self.slug)
    }
}

/// One page image of an episode
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct EpisodePage {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(skip_serializing)]
    pub episode_id: i64,
    /// 1-based position in the episode
    pub position: i64,
    pub image_id: i64,
    pub alt_text: Option<String>,
    pub page_title: Option<String>,
    pub caption: Option<String>,
}

/// Episode together with its ordered pages
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EpisodeWithPages {
    #[serde(flatten)]
    pub episode: Episode,
    pub pages: Vec<EpisodePage>,
}

impl EpisodeWithPages {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page at a 1-based position
    pub fn page(&self, number: usize) -> Option<&EpisodePage> {
        number.checked_sub(1).and_then(|idx| self.pages.get(idx))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EpisodePageInput {
    pub image_id: i64,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEpisodeInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub episode_number: i64,
    #[serde(default)]
    pub chapter_id: Option<i64>,
    pub publish_date: DateTime<Utc>,
    #[serde(default)]
    pub thumbnail_id: Option<i64>,
    #[serde(default)]
    pub author_notes: Option<String>,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
    pub pages: Vec<EpisodePageInput>,
}

/// Partial episode update. `pages`, when present, replaces every page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEpisodeInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub episode_number: Option<i64>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub chapter_id: Option<Option<i64>>,
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub thumbnail_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub author_notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub seo_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub seo_description: Option<Option<String>>,
    pub pages: Option<Vec<EpisodePageInput>>,
}

/// Sort order for episode lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum EpisodeSort {
    /// `episodeNumber`
    #[default]
    #[serde(rename = "episodeNumber")]
    NumberAsc,
    /// `-episodeNumber`
    #[serde(rename = "-episodeNumber")]
    NumberDesc,
}

impl EpisodeSort {
    pub fn sql(&self) -> &'static str {
        match self {
            EpisodeSort::NumberAsc => "episode_number ASC",
            EpisodeSort::NumberDesc => "episode_number DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode_with_pages(count: i64) -> EpisodeWithPages {
        let now = Utc::now();
        EpisodeWithPages {
            episode: Episode {
                id: 1,
                title: "The Gate".to_string(),
                slug: "the-gate".to_string(),
                episode_number: 1,
                chapter_id: None,
                publish_date: now,
                thumbnail_id: None,
                author_notes: None,
                seo_title: None,
                seo_description: None,
                created_at: now,
                updated_at: now,
            },
            pages: (1..=count)
                .map(|position| EpisodePage {
                    id: position,
                    episode_id: 1,
                    position,
                    image_id: position,
                    alt_text: None,
                    page_title: None,
                    caption: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_page_lookup_is_one_based() {
        let episode = episode_with_pages(3);
        assert!(episode.page(0).is_none());
        assert_eq!(episode.page(1).unwrap().position, 1);
        assert_eq!(episode.page(3).unwrap().position, 3);
        assert!(episode.page(4).is_none());
    }

    #[test]
    fn test_reader_path() {
        assert_eq!(episode_with_pages(1).episode.reader_path(), "/episode/the-gate/1");
    }

    #[test]
    fn test_sort_parses_payload_style_names() {
        let asc: EpisodeSort = serde_json::from_str(r#""episodeNumber""#).unwrap();
        let desc: EpisodeSort = serde_json::from_str(r#""-episodeNumber""#).unwrap();
        assert_eq!(asc, EpisodeSort::NumberAsc);
        assert_eq!(desc, EpisodeSort::NumberDesc);
        assert_eq!(desc.sql(), "episode_number DESC");
    }
}
