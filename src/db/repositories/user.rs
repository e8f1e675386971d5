//! User repository
//!
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{ListParams, PagedResult, User};
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const USER_COLUMNS: &str = "id, email, password_hash, name, created_at, updated_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Lookup by normalized email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn update(&self, user: &User) -> Result<User>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn count(&self) -> Result<i64>;

    async fn list(&self, params: &ListParams) -> Result<PagedResult<User>>;
}

pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let id = with_pool!(self.pool, conn => {
            sqlx::query(
                "INSERT INTO users (email, password_hash, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create user")?
            .insert_id()
        });

        Ok(User {
            id,
            created_at: now,
            updated_at: now,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get user by ID")?
        });
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let user = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, User>(&sql)
                .bind(email)
                .fetch_optional(conn)
                .await
                .context("Failed to get user by email")?
        });
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        with_pool!(self.pool, conn => {
            sqlx::query(
                "UPDATE users SET email = ?, password_hash = ?, name = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(now)
            .bind(user.id)
            .execute(conn)
            .await
            .context("Failed to update user")?;
        });

        Ok(User {
            updated_at: now,
            ..user.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete user")?;
        });
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count = with_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(conn)
                .await
                .context("Failed to count users")?
        });
        Ok(count)
    }

    async fn list(&self, params: &ListParams) -> Result<PagedResult<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY id ASC LIMIT ? OFFSET ?",
            USER_COLUMNS
        );
        let (items, total) = with_pool!(self.pool, conn => {
            let items = sqlx::query_as::<_, User>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list users")?;
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(conn)
                .await
                .context("Failed to count users")?;
            (items, total)
        });
        Ok(PagedResult::new(items, total, params))
    }
}
