//! Rate limiting for admin login
//!
//! - 5 failed attempts per email in 15 minutes
//! - 10 login requests per IP in 1 minute

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// Timestamps per key inside a sliding window
struct SlidingWindow<K> {
    hits: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
    limit: usize,
    window: Duration,
}

impl<K: Eq + Hash> SlidingWindow<K> {
    fn new(limit: usize, window: Duration) -> Self {
        Self {
            hits: RwLock::new(HashMap::new()),
            limit,
            window,
        }
    }

    async fn is_limited(&self, key: K) -> bool {
        let cutoff = Utc::now() - self.window;
        let mut hits = self.hits.write().await;
        let entry = hits.entry(key).or_default();
        entry.retain(|t| *t > cutoff);
        entry.len() >= self.limit
    }

    async fn record(&self, key: K) {
        self.hits.write().await.entry(key).or_default().push(Utc::now());
    }

    async fn reset(&self, key: &K) {
        self.hits.write().await.remove(key);
    }

    async fn prune(&self) {
        let cutoff = Utc::now() - self.window;
        self.hits.write().await.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
    }
}

pub struct LoginRateLimiter {
    emails: SlidingWindow<String>,
    ips: SlidingWindow<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            emails: SlidingWindow::new(5, Duration::minutes(15)),
            ips: SlidingWindow::new(10, Duration::minutes(1)),
        }
    }

    pub async fn is_email_limited(&self, email: &str) -> bool {
        self.emails.is_limited(email.trim().to_lowercase()).await
    }

    pub async fn record_failed_attempt(&self, email: &str) {
        self.emails.record(email.trim().to_lowercase()).await;
    }

    /// Forget failures after a successful login
    pub async fn clear_email_attempts(&self, email: &str) {
        self.emails.reset(&email.trim().to_lowercase()).await;
    }

    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        self.ips.is_limited(ip).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.ips.record(ip).await;
    }

    /// Drop expired entries; run periodically from a background task
    pub async fn cleanup(&self) {
        self.emails.prune().await;
        self.ips.prune().await;
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
