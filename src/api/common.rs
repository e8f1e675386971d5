//! Common API utilities and shared query types

use serde::Deserialize;

use crate::models::{EpisodeSort, ListParams, PublishStatus};

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for admin lists
pub fn default_per_page() -> u32 {
    20
}

/// `?page=&per_page=` on every collection list
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// `?status=draft|published` on post and page lists
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub status: Option<PublishStatus>,
}

/// `?sort=episodeNumber|-episodeNumber` on episode lists
#[derive(Debug, Deserialize)]
pub struct SortQuery {
    #[serde(default)]
    pub sort: EpisodeSort,
}

/// `?q=` on search
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}
