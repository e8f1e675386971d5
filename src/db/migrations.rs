//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings, one variant per
//! backend, and tracked in the `_migrations` table.
//!
//! # Usage
//!
//! ```ignore
//! use comic_platform::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;
use crate::with_pool;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                name VARCHAR(255),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                name VARCHAR(255) NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_media",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS media (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                alt VARCHAR(500) NOT NULL,
                caption TEXT,
                filename VARCHAR(255) NOT NULL,
                mime_type VARCHAR(100) NOT NULL,
                filesize INTEGER NOT NULL DEFAULT 0,
                width INTEGER,
                height INTEGER,
                url VARCHAR(500) NOT NULL,
                cloudinary_public_id VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_media_created_at ON media(created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS media (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                alt VARCHAR(500) NOT NULL,
                caption TEXT NULL,
                filename VARCHAR(255) NOT NULL,
                mime_type VARCHAR(100) NOT NULL,
                filesize BIGINT NOT NULL DEFAULT 0,
                width BIGINT NULL,
                height BIGINT NULL,
                url VARCHAR(500) NOT NULL,
                cloudinary_public_id VARCHAR(500) NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_media_created_at ON media(created_at);
        "#,
    },
    Migration {
        version: 4,
        name: "create_books_chapters_episodes",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                description TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS chapters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                chapter_number INTEGER NOT NULL UNIQUE,
                description TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                episode_number INTEGER NOT NULL UNIQUE,
                chapter_id INTEGER,
                publish_date TIMESTAMP NOT NULL,
                thumbnail_id INTEGER,
                author_notes TEXT,
                seo_title VARCHAR(255),
                seo_description TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE SET NULL,
                FOREIGN KEY (thumbnail_id) REFERENCES media(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_episodes_chapter_id ON episodes(chapter_id);
            CREATE TABLE IF NOT EXISTS episode_pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                episode_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                image_id INTEGER NOT NULL,
                alt_text VARCHAR(500),
                page_title VARCHAR(255),
                caption TEXT,
                FOREIGN KEY (episode_id) REFERENCES episodes(id) ON DELETE CASCADE,
                FOREIGN KEY (image_id) REFERENCES media(id),
                UNIQUE (episode_id, position)
            );
            CREATE INDEX IF NOT EXISTS idx_episode_pages_image_id ON episode_pages(image_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS books (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                description TEXT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS chapters (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                chapter_number BIGINT NOT NULL UNIQUE,
                description TEXT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS episodes (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                episode_number BIGINT NOT NULL UNIQUE,
                chapter_id BIGINT NULL,
                publish_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                thumbnail_id BIGINT NULL,
                author_notes TEXT NULL,
                seo_title VARCHAR(255) NULL,
                seo_description TEXT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE SET NULL,
                FOREIGN KEY (thumbnail_id) REFERENCES media(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_episodes_chapter_id ON episodes(chapter_id);
            CREATE TABLE IF NOT EXISTS episode_pages (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                episode_id BIGINT NOT NULL,
                position BIGINT NOT NULL,
                image_id BIGINT NOT NULL,
                alt_text VARCHAR(500) NULL,
                page_title VARCHAR(255) NULL,
                caption TEXT NULL,
                FOREIGN KEY (episode_id) REFERENCES episodes(id) ON DELETE CASCADE,
                FOREIGN KEY (image_id) REFERENCES media(id),
                UNIQUE KEY uq_episode_pages_position (episode_id, position)
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_categories_posts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                content TEXT NOT NULL DEFAULT '',
                hero_image_id INTEGER,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                published_at TIMESTAMP,
                meta_title VARCHAR(255),
                meta_description TEXT,
                meta_image_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (hero_image_id) REFERENCES media(id) ON DELETE SET NULL,
                FOREIGN KEY (meta_image_id) REFERENCES media(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status);
            CREATE INDEX IF NOT EXISTS idx_posts_published_at ON posts(published_at);
            CREATE TABLE IF NOT EXISTS post_categories (
                post_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                PRIMARY KEY (post_id, category_id),
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_post_categories_category_id ON post_categories(category_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS posts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                content LONGTEXT NOT NULL,
                hero_image_id BIGINT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                published_at TIMESTAMP NULL,
                meta_title VARCHAR(255) NULL,
                meta_description TEXT NULL,
                meta_image_id BIGINT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (hero_image_id) REFERENCES media(id) ON DELETE SET NULL,
                FOREIGN KEY (meta_image_id) REFERENCES media(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_posts_status ON posts(status);
            CREATE INDEX idx_posts_published_at ON posts(published_at);
            CREATE TABLE IF NOT EXISTS post_categories (
                post_id BIGINT NOT NULL,
                category_id BIGINT NOT NULL,
                PRIMARY KEY (post_id, category_id),
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_post_categories_category_id ON post_categories(category_id);
        "#,
    },
    Migration {
        version: 6,
        name: "create_pages",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                published_at TIMESTAMP,
                hero_type VARCHAR(20) NOT NULL DEFAULT 'lowImpact',
                hero_rich_text TEXT,
                hero_media_id INTEGER,
                hero_links TEXT NOT NULL DEFAULT '[]',
                layout TEXT NOT NULL DEFAULT '[]',
                meta_title VARCHAR(255),
                meta_description TEXT,
                meta_image_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (hero_media_id) REFERENCES media(id) ON DELETE SET NULL,
                FOREIGN KEY (meta_image_id) REFERENCES media(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_pages_status ON pages(status);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS pages (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                published_at TIMESTAMP NULL,
                hero_type VARCHAR(20) NOT NULL DEFAULT 'lowImpact',
                hero_rich_text TEXT NULL,
                hero_media_id BIGINT NULL,
                hero_links LONGTEXT NOT NULL,
                layout LONGTEXT NOT NULL,
                meta_title VARCHAR(255) NULL,
                meta_description TEXT NULL,
                meta_image_id BIGINT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (hero_media_id) REFERENCES media(id) ON DELETE SET NULL,
                FOREIGN KEY (meta_image_id) REFERENCES media(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_pages_status ON pages(status);
        "#,
    },
    Migration {
        version: 7,
        name: "create_social_links",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS social_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                label VARCHAR(255) NOT NULL,
                platform VARCHAR(32) NOT NULL DEFAULT 'other',
                url VARCHAR(1000) NOT NULL UNIQUE,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_social_links_sort_order ON social_links(sort_order);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS social_links (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                label VARCHAR(255) NOT NULL,
                platform VARCHAR(32) NOT NULL DEFAULT 'other',
                url VARCHAR(768) NOT NULL UNIQUE,
                sort_order BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_social_links_sort_order ON social_links(sort_order);
        "#,
    },
    Migration {
        version: 8,
        name: "create_newsletter",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS newsletter_subscribers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_newsletter_subscribers_email ON newsletter_subscribers(email);
            CREATE TABLE IF NOT EXISTS newsletter_notices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject VARCHAR(255) NOT NULL,
                message TEXT NOT NULL,
                episode_id INTEGER,
                archive_path VARCHAR(255) NOT NULL DEFAULT '/archive',
                send_notice BOOLEAN NOT NULL DEFAULT 0,
                recipient_count INTEGER NOT NULL DEFAULT 0,
                sent_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (episode_id) REFERENCES episodes(id) ON DELETE SET NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS newsletter_subscribers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS newsletter_notices (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                subject VARCHAR(255) NOT NULL,
                message TEXT NOT NULL,
                episode_id BIGINT NULL,
                archive_path VARCHAR(255) NOT NULL DEFAULT '/archive',
                send_notice BOOLEAN NOT NULL DEFAULT FALSE,
                recipient_count BIGINT NOT NULL DEFAULT 0,
                sent_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (episode_id) REFERENCES episodes(id) ON DELETE SET NULL
            );
        "#,
    },
    Migration {
        version: 9,
        name: "create_globals",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS globals (
                name VARCHAR(64) PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS globals (
                name VARCHAR(64) PRIMARY KEY,
                data LONGTEXT NOT NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 10,
        name: "add_chapter_book",
        up_sqlite: r#"
            ALTER TABLE chapters ADD COLUMN book_id INTEGER REFERENCES books(id) ON DELETE SET NULL;
            CREATE INDEX IF NOT EXISTS idx_chapters_book_id ON chapters(book_id);
        "#,
        up_mysql: r#"
            ALTER TABLE chapters ADD COLUMN book_id BIGINT NULL;
            ALTER TABLE chapters ADD CONSTRAINT fk_chapters_book FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE SET NULL;
        "#,
    },
    Migration {
        version: 11,
        name: "add_impact_and_font_override",
        up_sqlite: r#"
            ALTER TABLE posts ADD COLUMN impact VARCHAR(20) NOT NULL DEFAULT 'lowImpact';
            ALTER TABLE posts ADD COLUMN font_override VARCHAR(32) NOT NULL DEFAULT 'default';
            ALTER TABLE pages ADD COLUMN font_override VARCHAR(32) NOT NULL DEFAULT 'default';
        "#,
        up_mysql: r#"
            ALTER TABLE posts ADD COLUMN impact VARCHAR(20) NOT NULL DEFAULT 'lowImpact';
            ALTER TABLE posts ADD COLUMN font_override VARCHAR(32) NOT NULL DEFAULT 'default';
            ALTER TABLE pages ADD COLUMN font_override VARCHAR(32) NOT NULL DEFAULT 'default';
        "#,
    },
    Migration {
        version: 12,
        name: "add_notice_customization",
        up_sqlite: r#"
            ALTER TABLE newsletter_notices ADD COLUMN image_id INTEGER REFERENCES media(id) ON DELETE SET NULL;
            ALTER TABLE newsletter_notices ADD COLUMN background_color VARCHAR(32) NOT NULL DEFAULT '#ffffff';
            ALTER TABLE newsletter_notices ADD COLUMN text_color VARCHAR(32) NOT NULL DEFAULT '#111827';
            ALTER TABLE newsletter_notices ADD COLUMN button_color VARCHAR(32) NOT NULL DEFAULT '#111827';
            ALTER TABLE newsletter_notices ADD COLUMN button_text_color VARCHAR(32) NOT NULL DEFAULT '#ffffff';
            ALTER TABLE newsletter_notices ADD COLUMN cta_label VARCHAR(100) NOT NULL DEFAULT 'Read now';
        "#,
        up_mysql: r#"
            ALTER TABLE newsletter_notices ADD COLUMN image_id BIGINT NULL;
            ALTER TABLE newsletter_notices ADD CONSTRAINT fk_notices_image FOREIGN KEY (image_id) REFERENCES media(id) ON DELETE SET NULL;
            ALTER TABLE newsletter_notices ADD COLUMN background_color VARCHAR(32) NOT NULL DEFAULT '#ffffff';
            ALTER TABLE newsletter_notices ADD COLUMN text_color VARCHAR(32) NOT NULL DEFAULT '#111827';
            ALTER TABLE newsletter_notices ADD COLUMN button_color VARCHAR(32) NOT NULL DEFAULT '#111827';
            ALTER TABLE newsletter_notices ADD COLUMN button_text_color VARCHAR(32) NOT NULL DEFAULT '#ffffff';
            ALTER TABLE newsletter_notices ADD COLUMN cta_label VARCHAR(100) NOT NULL DEFAULT 'Read now';
        "#,
    },
    Migration {
        version: 13,
        name: "create_versions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS post_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL,
                snapshot TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_post_versions_post_id ON post_versions(post_id);
            CREATE TABLE IF NOT EXISTS page_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL,
                snapshot TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_page_versions_page_id ON page_versions(page_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS post_versions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                post_id BIGINT NOT NULL,
                snapshot LONGTEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_post_versions_post_id ON post_versions(post_id);
            CREATE TABLE IF NOT EXISTS page_versions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                page_id BIGINT NOT NULL,
                snapshot LONGTEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_page_versions_page_id ON page_versions(page_id);
        "#,
    },
];

/// Run all pending migrations
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    let records = with_pool!(*pool, conn => {
        sqlx::query_as::<_, MigrationRecord>(
            "SELECT version, name, applied_at FROM _migrations ORDER BY version",
        )
        .fetch_all(conn)
        .await
        .context("Failed to read applied migrations")?
    });
    Ok(records)
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => migration.up_sqlite,
        DatabaseDriver::Mysql => migration.up_mysql,
    };

    with_pool!(*pool, conn => {
        for statement in split_sql_statements(sql) {
            sqlx::query(statement)
                .execute(conn)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }

        sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(conn)
            .await
            .context("Failed to record migration")?;
    });

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_statement = false;

    for (i, c) in sql.char_indices() {
        match c {
            ';' => {
                if in_statement {
                    let stmt = sql[current_start..i].trim();
                    if !stmt.is_empty() && !is_comment_only(stmt) {
                        statements.push(stmt);
                    }
                    in_statement = false;
                }
                current_start = i + 1;
            }
            _ if !c.is_whitespace() && !in_statement => {
                current_start = i;
                in_statement = true;
            }
            _ => {}
        }
    }

    if in_statement {
        let stmt = sql[current_start..].trim();
        if !stmt.is_empty() && !is_comment_only(stmt) {
            statements.push(stmt);
        }
    }

    statements
}

fn is_comment_only(s: &str) -> bool {
    s.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with("--")
    })
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(applied.len() == MIGRATIONS.len())
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

pub fn total_migrations() -> usize {
    MIGRATIONS.len()
}

pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}
