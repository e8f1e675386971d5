//! Session repository
//!
//! Persistence for login sessions. The session id is the bearer token.

use crate::db::DynDatabasePool;
use crate::models::Session;
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a user
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<i64>;
}

pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        with_pool!(self.pool, conn => {
            sqlx::query(
                "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .bind(session.created_at)
            .execute(conn)
            .await
            .context("Failed to create session")?;
        });
        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        let session = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, Session>(
                "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(conn)
            .await
            .context("Failed to get session")?
        });
        Ok(session)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete session")?;
        });
        Ok(())
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                .bind(user_id)
                .execute(conn)
                .await
                .context("Failed to delete sessions for user")?;
        });
        Ok(())
    }

    async fn delete_expired(&self) -> Result<i64> {
        let now = Utc::now();
        let affected = with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(now)
                .execute(conn)
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected()
        });
        Ok(affected as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use chrono::Duration;

    async fn setup_test_repo() -> (SqlxSessionRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "ink@example.com".to_string(),
                "hash".to_string(),
                None,
            ))
            .await
            .unwrap();

        (SqlxSessionRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (repo, user_id) = setup_test_repo().await;
        let session = Session::new(user_id, 7);
        repo.create(&session).await.unwrap();

        let found = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(found.user_id, user_id);
        assert!(!found.is_expired());
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_sessions() {
        let (repo, user_id) = setup_test_repo().await;
        let first = Session::new(user_id, 7);
        let second = Session::new(user_id, 7);
        repo.create(&first).await.unwrap();
        repo.create(&second).await.unwrap();

        repo.delete(&first.id).await.unwrap();
        assert!(repo.get_by_id(&first.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&second.id).await.unwrap().is_some());

        repo.delete_by_user(user_id).await.unwrap();
        assert!(repo.get_by_id(&second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let (repo, user_id) = setup_test_repo().await;
        let now = Utc::now();
        let expired = Session {
            id: "expired-token".to_string(),
            user_id,
            expires_at: now - Duration::days(1),
            created_at: now - Duration::days(8),
        };
        let valid = Session::new(user_id, 7);
        repo.create(&expired).await.unwrap();
        repo.create(&valid).await.unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id(&expired.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&valid.id).await.unwrap().is_some());
    }
}
