//! Cache revalidation
//!
//! Frontend fetchers cache their results under tags (see [`crate::cache`]).
//! Writes drop the affected tags here. Episode changes additionally POST to
//! `/next/revalidate-episodes` on this site and on every configured peer so
//! that other instances drop their copies too. That call is fire-and-forget:
//! failures are logged and never retried.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::config::{RevalidationConfig, SiteConfig};

pub const REVALIDATE_SECRET_HEADER: &str = "x-revalidate-secret";
pub const REVALIDATE_EPISODES_PATH: &str = "/next/revalidate-episodes";

/// Cache tags shared by the fetchers and the write paths
pub mod tags {
    pub const COLLECTION_EPISODES: &str = "collection_episodes";
    pub const EPISODES_LATEST: &str = "episodes_latest";
    pub const COLLECTION_SOCIAL_LINKS: &str = "collection_social-links";
    pub const POSTS_SITEMAP: &str = "posts-sitemap";
    pub const PAGES_SITEMAP: &str = "pages-sitemap";

    /// Tags dropped on every episode write
    pub const EPISODE_TAGS: [&str; 2] = [COLLECTION_EPISODES, EPISODES_LATEST];
}

/// Tag under which everything rendered for `path` is cached
pub fn path_tag(path: &str) -> String {
    format!("path:{}", path)
}

/// Per-request switches accepted by every write operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MutationContext {
    /// Skip cache revalidation for this write
    pub disable_revalidate: bool,
    /// Save a notice without sending it
    pub skip_newsletter_send: bool,
}

impl MutationContext {
    pub fn quiet() -> Self {
        Self {
            disable_revalidate: true,
            skip_newsletter_send: false,
        }
    }
}

pub struct Revalidator {
    cache: Arc<Cache>,
    client: reqwest::Client,
    server_url: String,
    secret: Option<String>,
    peers: Vec<String>,
}

impl Revalidator {
    pub fn new(cache: Arc<Cache>, site: &SiteConfig, config: &RevalidationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_default();

        Self {
            cache,
            client,
            server_url: site.server_url.trim_end_matches('/').to_string(),
            secret: config.secret.clone().filter(|s| !s.is_empty()),
            peers: config
                .peers
                .iter()
                .map(|p| p.trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Drop every cached entry carrying `tag`. Never fails the write.
    pub async fn revalidate_tag(&self, tag: &str) {
        match self.cache.invalidate_tag(tag).await {
            Ok(()) => tracing::debug!("Revalidated tag {}", tag),
            Err(e) => tracing::error!("Failed to revalidate tag {}: {}", tag, e),
        }
    }

    pub async fn revalidate_path(&self, path: &str) {
        tracing::info!("Revalidating path: {}", path);
        self.revalidate_tag(&path_tag(path)).await;
    }

    /// Drop the episode tags locally; returns the tags dropped
    pub async fn revalidate_episode_tags(&self) -> [&'static str; 2] {
        for tag in tags::EPISODE_TAGS {
            self.revalidate_tag(tag).await;
        }
        tags::EPISODE_TAGS
    }

    /// Does `provided` match the configured secret?
    ///
    /// Without a configured secret nothing matches. The comparison runs in
    /// constant time.
    pub fn verify_secret(&self, provided: Option<&str>) -> bool {
        match (self.secret.as_deref(), provided) {
            (Some(expected), Some(provided)) => secrets_match(expected, provided),
            _ => false,
        }
    }

    /// Ask this site and every peer to drop their episode caches.
    ///
    /// Returns immediately; the requests run on a spawned task.
    pub fn trigger_episode_revalidation(&self) {
        let secret = match (&self.secret, self.server_url.is_empty()) {
            (Some(secret), false) => secret.clone(),
            _ => {
                tracing::error!(
                    "Skipping episode revalidation: NEXT_PUBLIC_SERVER_URL or PAYLOAD_SECRET is missing."
                );
                return;
            }
        };

        let mut targets = vec![self.server_url.clone()];
        targets.extend(self.peers.iter().filter(|p| **p != self.server_url).cloned());

        let client = self.client.clone();
        tokio::spawn(async move {
            let calls = targets
                .iter()
                .map(|base| post_revalidation(&client, base, &secret));
            futures::future::join_all(calls).await;
        });
    }
}

async fn post_revalidation(client: &reqwest::Client, base: &str, secret: &str) {
    let url = format!("{}{}", base, REVALIDATE_EPISODES_PATH);
    match client
        .post(&url)
        .header(REVALIDATE_SECRET_HEADER, secret)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            tracing::info!("Episode tags revalidated via route handler.");
        }
        Ok(response) => {
            tracing::error!(
                "Episode revalidation request failed with status {}.",
                response.status().as_u16()
            );
        }
        Err(e) => {
            tracing::error!("Episode revalidation request failed: {}", e);
        }
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Constant-time comparison of two secrets through their HMAC tags
fn secrets_match(expected: &str, provided: &str) -> bool {
    let tag = |value: &str| {
        HmacSha256::new_from_slice(REVALIDATE_SECRET_HEADER.as_bytes()).map(|mut mac| {
            mac.update(value.as_bytes());
            mac
        })
    };
    match (tag(expected), tag(provided)) {
        (Ok(expected), Ok(provided)) => provided
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}
