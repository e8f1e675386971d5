//! Global document repository
//!
//! Site settings, header and footer are single JSON documents keyed by name.

use crate::db::DynDatabasePool;
use crate::models::GlobalDocument;
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

#[async_trait]
pub trait GlobalsRepository: Send + Sync {
    /// Raw JSON for a document, if it has ever been saved
    async fn get_raw(&self, name: &str) -> Result<Option<String>>;

    /// Insert or replace a document
    async fn put_raw(&self, name: &str, data: &str) -> Result<()>;
}

/// Typed access on top of the raw store
pub async fn load_global<T: GlobalDocument>(repo: &dyn GlobalsRepository) -> Result<T> {
    match repo.get_raw(T::NAME).await? {
        Some(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("Failed to decode global {}", T::NAME)),
        None => Ok(T::default()),
    }
}

pub async fn save_global<T: GlobalDocument>(repo: &dyn GlobalsRepository, doc: &T) -> Result<()> {
    let data = serde_json::to_string(doc)
        .with_context(|| format!("Failed to encode global {}", T::NAME))?;
    repo.put_raw(T::NAME, &data).await
}

pub struct SqlxGlobalsRepository {
    pool: DynDatabasePool,
}

impl SqlxGlobalsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn GlobalsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl GlobalsRepository for SqlxGlobalsRepository {
    async fn get_raw(&self, name: &str) -> Result<Option<String>> {
        let data = with_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, String>("SELECT data FROM globals WHERE name = ?")
                .bind(name)
                .fetch_optional(conn)
                .await
                .context("Failed to get global")?
        });
        Ok(data)
    }

    async fn put_raw(&self, name: &str, data: &str) -> Result<()> {
        let now = Utc::now();
        with_pool!(self.pool, conn => {
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM globals WHERE name = ?")
                .bind(name)
                .fetch_one(conn)
                .await
                .context("Failed to check global")?
                > 0;
            let sql = if exists {
                "UPDATE globals SET data = ?, updated_at = ? WHERE name = ?"
            } else {
                "INSERT INTO globals (data, updated_at, name) VALUES (?, ?, ?)"
            };
            sqlx::query(sql)
                .bind(data)
                .bind(now)
                .bind(name)
                .execute(conn)
                .await
                .context("Failed to save global")?;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Footer, SiteSettings};

    #[tokio::test]
    async fn test_missing_document_loads_defaults() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxGlobalsRepository::new(pool);

        let footer: Footer = load_global(&repo).await.unwrap();
        assert_eq!(footer, Footer::default());
    }

    #[tokio::test]
    async fn test_save_then_overwrite() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxGlobalsRepository::new(pool);

        let mut settings = SiteSettings::default();
        settings.site_title = "Night Shift".to_string();
        save_global(&repo, &settings).await.unwrap();

        settings.site_title = "Night Shift Comics".to_string();
        save_global(&repo, &settings).await.unwrap();

        let loaded: SiteSettings = load_global(&repo).await.unwrap();
        assert_eq!(loaded.site_title, "Night Shift Comics");
    }
}
