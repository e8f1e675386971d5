//! Cache layer
//!
//! Caching for the frontend fetchers. Two backends:
//! - In-memory cache (moka), the default for a single instance
//! - Redis cache, optional, for several instances behind one balancer
//!
//! Cached values are stored under tagged keys (`|tag1|tag2|:name`) so a
//! revalidation can drop every entry that carries a tag with one glob.
//!
//! # Usage
//!
//! ```rust,ignore
//! use comic_platform::cache::{create_cache, tagged_key};
//! use comic_platform::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default()).await?;
//! let key = tagged_key(&["collection_episodes"], "archive");
//! cache.set(&key, &episodes, Duration::from_secs(60)).await?;
//! cache.invalidate_tag("collection_episodes").await?;
//! ```

pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, CacheDriver};

/// Cache layer trait
///
/// The methods are generic, so this trait is not object safe. Use the
/// [`Cache`] enum for runtime selection of the backend.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Store a value that expires after `ttl`
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob (`*` and `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

pub use memory::MemoryCache;
#[cfg(feature = "redis-cache")]
pub use redis::RedisCache;

/// Key for a cached value carrying the given tags
pub fn tagged_key(tags: &[&str], name: &str) -> String {
    let mut key = String::from("|");
    for tag in tags {
        key.push_str(tag);
        key.push('|');
    }
    key.push(':');
    key.push_str(name);
    key
}

/// Glob matching every key that carries `tag`
pub fn tag_pattern(tag: &str) -> String {
    format!("*|{}|*", tag)
}

#[derive(Debug)]
pub enum Cache {
    Memory(MemoryCache),
    #[cfg(feature = "redis-cache")]
    Redis(RedisCache),
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            Cache::Memory(cache) => cache.get(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.get(key).await,
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.set(key, value, ttl).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.delete(key).await,
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete_pattern(pattern).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.delete_pattern(pattern).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.clear().await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.clear().await,
        }
    }
}

impl Cache {
    /// Drop every entry carrying `tag`
    pub async fn invalidate_tag(&self, tag: &str) -> Result<()> {
        self.delete_pattern(&tag_pattern(tag)).await
    }

    /// Return the cached value for `tags` + `name`, or run `load` and cache
    /// its result.
    ///
    /// A broken cache never fails the request: read and write errors are
    /// logged and the loader result is returned as is.
    pub async fn remember<T, F, Fut>(
        &self,
        tags: &[&str],
        name: &str,
        ttl: Duration,
        load: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let key = tagged_key(tags, name);
        match self.get::<T>(&key).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
        }

        let value = load().await?;
        if let Err(e) = self.set(&key, &value, ttl).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
        Ok(value)
    }
}

/// Create the cache selected by configuration
///
/// # Errors
/// - Redis is configured but the `redis-cache` feature is off
/// - Redis connection fails
pub async fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    let ttl = Duration::from_secs(config.ttl_seconds);

    match config.driver {
        CacheDriver::Memory => {
            let cache = MemoryCache::with_capacity_and_ttl(10_000, ttl);
            Ok(Arc::new(Cache::Memory(cache)))
        }
        CacheDriver::Redis => {
            #[cfg(feature = "redis-cache")]
            {
                let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "Redis URL is required when using Redis cache driver. \
                         Set 'redis_url' in cache configuration or use COMIC_CACHE_REDIS_URL environment variable."
                    )
                })?;

                let cache = RedisCache::with_ttl(redis_url, ttl).await?;
                Ok(Arc::new(Cache::Redis(cache)))
            }

            #[cfg(not(feature = "redis-cache"))]
            {
                anyhow::bail!(
                    "Redis cache driver is configured but the 'redis-cache' feature is not enabled. \
                     Either enable the feature with `--features redis-cache` or use 'memory' cache driver."
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_tagged_key_format() {
        assert_eq!(
            tagged_key(&["collection_episodes", "episodes_latest"], "latest"),
            "|collection_episodes|episodes_latest|:latest"
        );
        assert_eq!(tagged_key(&[], "plain"), "|:plain");
        assert_eq!(tag_pattern("episodes_latest"), "*|episodes_latest|*");
    }

    #[tokio::test]
    async fn test_create_memory_cache() {
        let cache = create_cache(&CacheConfig::default()).await.unwrap();
        cache
            .set("test_key", &"test_value".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let result: Option<String> = cache.get("test_key").await.unwrap();
        assert_eq!(result, Some("test_value".to_string()));
    }

    #[tokio::test]
    async fn test_invalidate_tag_only_drops_tagged_entries() {
        let cache = create_cache(&CacheConfig::default()).await.unwrap();
        let ttl = Duration::from_secs(60);
        let latest = tagged_key(&["collection_episodes", "episodes_latest"], "latest");
        let archive = tagged_key(&["collection_episodes"], "archive");
        let social = tagged_key(&["collection_social-links"], "social");
        for key in [&latest, &archive, &social] {
            cache.set(key, &1_i64, ttl).await.unwrap();
        }

        cache.invalidate_tag("episodes_latest").await.unwrap();
        assert!(cache.get::<i64>(&latest).await.unwrap().is_none());
        assert_eq!(cache.get::<i64>(&archive).await.unwrap(), Some(1));

        cache.invalidate_tag("collection_episodes").await.unwrap();
        assert!(cache.get::<i64>(&archive).await.unwrap().is_none());
        assert_eq!(cache.get::<i64>(&social).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_remember_loads_once_until_invalidated() {
        let cache = create_cache(&CacheConfig::default()).await.unwrap();
        let calls = AtomicUsize::new(0);
        let load = || {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(vec![3_i64, 2, 1])
            }
        };

        let ttl = Duration::from_secs(60);
        let first: Vec<i64> = cache.remember(&["collection_episodes"], "archive", ttl, load).await.unwrap();
        let second: Vec<i64> = cache.remember(&["collection_episodes"], "archive", ttl, load).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate_tag("collection_episodes").await.unwrap();
        let _: Vec<i64> = cache.remember(&["collection_episodes"], "archive", ttl, load).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[cfg(not(feature = "redis-cache"))]
    #[tokio::test]
    async fn test_create_redis_cache_without_feature() {
        let config = CacheConfig {
            driver: CacheDriver::Redis,
            redis_url: Some("redis://localhost:6379".to_string()),
            ttl_seconds: 3600,
        };
        let err = create_cache(&config).await.unwrap_err().to_string();
        assert!(err.contains("redis-cache") && err.contains("feature"));
    }

    #[cfg(feature = "redis-cache")]
    #[tokio::test]
    async fn test_create_redis_cache_without_url() {
        let config = CacheConfig {
            driver: CacheDriver::Redis,
            redis_url: None,
            ttl_seconds: 3600,
        };
        let err = create_cache(&config).await.unwrap_err().to_string();
        assert!(err.contains("Redis URL"));
    }
}
