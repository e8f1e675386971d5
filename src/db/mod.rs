//! Database layer
//!
//! Comic content lives in either SQLite (default, single-binary deployment) or
//! MySQL. The driver is selected from configuration.
//!
//! Repositories never talk to a concrete pool type directly. They hold a
//! [`DynDatabasePool`] and use [`with_pool!`](crate::with_pool) to run one
//! query body against whichever backend is configured.
//!
//! # Usage
//!
//! ```ignore
//! use comic_platform::config::DatabaseConfig;
//! use comic_platform::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, InsertId, MysqlDatabase,
    SqliteDatabase,
};
