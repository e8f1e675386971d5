//! Redis cache implementation
//!
//! Shared cache for multi-instance deployments. Tag invalidation walks the
//! keyspace with `SCAN MATCH` so a revalidation never blocks the server.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Prefix for every key this site writes
const KEY_PREFIX: &str = "comic:";

const SCAN_COUNT: usize = 100;

pub struct RedisCache {
    connection: MultiplexedConnection,
    default_ttl: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    pub async fn with_ttl(redis_url: &str, default_ttl: Duration) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            connection,
            default_ttl,
        })
    }

    fn full_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    /// Redis globs treat `[` and `\` as special; tags never need them
    fn scan_pattern(pattern: &str) -> String {
        let escaped = pattern.replace('\\', "\\\\").replace('[', "\\[");
        Self::full_key(&escaped)
    }

    async fn scan_delete(&self, pattern: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .context("Failed to scan keys in Redis")?;

            if !keys.is_empty() {
                let _: () = conn
                    .del(&keys)
                    .await
                    .context("Failed to delete keys from Redis")?;
            }

            cursor = next;
            if cursor == 0 {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl CacheLayer for RedisCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn
            .get(Self::full_key(key))
            .await
            .context("Failed to get value from Redis")?;

        raw.map(|json| serde_json::from_str(&json).context("Failed to deserialize cached value"))
            .transpose()
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        let secs = ttl.min(self.default_ttl).as_secs().max(1);

        let _: () = conn
            .set_ex(Self::full_key(key), json, secs)
            .await
            .context("Failed to set value in Redis")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(Self::full_key(key))
            .await
            .context("Failed to delete key from Redis")?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        self.scan_delete(&Self::scan_pattern(pattern)).await
    }

    /// Only this site's keys are removed; other data in the database stays
    async fn clear(&self) -> Result<()> {
        self.scan_delete(&format!("{}*", KEY_PREFIX)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    #[test]
    fn test_scan_pattern_is_prefixed_and_escaped() {
        assert_eq!(RedisCache::scan_pattern("*|tag|*"), "comic:*|tag|*");
        assert_eq!(RedisCache::scan_pattern("*|a[b|*"), "comic:*|a\\[b|*");
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_tag_invalidation() {
        let cache = RedisCache::with_ttl(&redis_url(), Duration::from_secs(60))
            .await
            .unwrap();
        let ttl = Duration::from_secs(60);
        cache.set("|collection_episodes|:archive", &1_i64, ttl).await.unwrap();
        cache.set("|collection_social-links|:social", &2_i64, ttl).await.unwrap();

        cache.delete_pattern("*|collection_episodes|*").await.unwrap();
        assert!(cache
            .get::<i64>("|collection_episodes|:archive")
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            cache.get::<i64>("|collection_social-links|:social").await.unwrap(),
            Some(2)
        );
        cache.clear().await.unwrap();
    }
}
