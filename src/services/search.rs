//! Site search over episodes and published posts

use crate::db::repositories::{EpisodeRepository, PostRepository};
use crate::models::{Episode, Post};
use crate::services::media::MediaService;
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

pub const MAX_SEARCH_RESULTS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Episode,
    Post,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResult {
    pub kind: SearchKind,
    pub title: String,
    pub slug: String,
    pub href: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

pub struct SearchService {
    episodes: Arc<dyn EpisodeRepository>,
    posts: Arc<dyn PostRepository>,
    media: Arc<MediaService>,
}

impl SearchService {
    pub fn new(
        episodes: Arc<dyn EpisodeRepository>,
        posts: Arc<dyn PostRepository>,
        media: Arc<MediaService>,
    ) -> Self {
        Self {
            episodes,
            posts,
            media,
        }
    }

    /// Up to 12 matches, episodes first. A blank query lists the newest.
    pub async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResult>> {
        let limit = MAX_SEARCH_RESULTS as i64;
        let episodes = self
            .episodes
            .search(query, limit)
            .await
            .context("Failed to search episodes")?;

        let remaining = MAX_SEARCH_RESULTS.saturating_sub(episodes.len());
        let posts = if remaining > 0 {
            self.posts
                .search(query, remaining as i64)
                .await
                .context("Failed to search posts")?
        } else {
            Vec::new()
        };

        let image_ids: Vec<i64> = episodes
            .iter()
            .filter_map(|e| e.thumbnail_id)
            .chain(posts.iter().filter_map(|p| p.meta.image_id.or(p.hero_image_id)))
            .collect();
        let images = self
            .media
            .get_many(&image_ids)
            .await
            .context("Failed to load search images")?;
        let image_url = |id: Option<i64>| id.and_then(|id| images.get(&id)).map(|m| m.url.clone());

        let mut results: Vec<SearchResult> = episodes
            .iter()
            .filter(|e| !e.slug.is_empty())
            .map(|e| SearchResult {
                image_url: image_url(e.thumbnail_id),
                ..episode_result(e)
            })
            .collect();
        results.extend(posts.iter().filter(|p| !p.slug.is_empty()).map(|p| SearchResult {
            image_url: image_url(p.meta.image_id.or(p.hero_image_id)),
            ..post_result(p)
        }));
        results.truncate(MAX_SEARCH_RESULTS);
        Ok(results)
    }
}

fn episode_result(episode: &Episode) -> SearchResult {
    SearchResult {
        kind: SearchKind::Episode,
        title: display_title(episode.seo_title.as_deref(), &episode.title, &episode.slug),
        slug: episode.slug.clone(),
        href: format!("/episode/{}/1", episode.slug),
        description: non_blank(episode.seo_description.as_deref()),
        image_url: None,
    }
}

fn post_result(post: &Post) -> SearchResult {
    SearchResult {
        kind: SearchKind::Post,
        title: display_title(post.meta.title.as_deref(), &post.title, &post.slug),
        slug: post.slug.clone(),
        href: post.path(),
        description: non_blank(post.meta.description.as_deref()),
        image_url: None,
    }
}

/// Meta title, else title, else slug
fn display_title(meta_title: Option<&str>, title: &str, slug: &str) -> String {
    [meta_title.unwrap_or_default(), title, slug]
        .into_iter()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
