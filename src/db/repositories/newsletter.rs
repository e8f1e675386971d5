//! Newsletter subscriber and notice repositories

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{ListParams, NewsletterNotice, NewsletterSubscriber, PagedResult};
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const SUBSCRIBER_COLUMNS: &str = "id, email, created_at, updated_at";

const NOTICE_COLUMNS: &str = "id, subject, message, episode_id, archive_path, image_id, send_notice, recipient_count, sent_at, background_color, text_color, button_color, button_text_color, cta_label, created_at, updated_at";

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Insert an already-normalized address
    async fn create(&self, email: &str) -> Result<NewsletterSubscriber>;

    async fn get_by_id(&self, id: i64) -> Result<Option<NewsletterSubscriber>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<NewsletterSubscriber>>;

    /// Oldest first, so paging through the list while sending is stable
    async fn list(&self, params: &ListParams) -> Result<PagedResult<NewsletterSubscriber>>;

    async fn update(&self, subscriber: &NewsletterSubscriber) -> Result<NewsletterSubscriber>;

    async fn delete(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait NoticeRepository: Send + Sync {
    async fn create(&self, notice: &NewsletterNotice) -> Result<NewsletterNotice>;

    async fn get_by_id(&self, id: i64) -> Result<Option<NewsletterNotice>>;

    /// Newest first
    async fn list(&self, params: &ListParams) -> Result<PagedResult<NewsletterNotice>>;

    async fn update(&self, notice: &NewsletterNotice) -> Result<NewsletterNotice>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxSubscriberRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriberRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriberRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubscriberRepository for SqlxSubscriberRepository {
    async fn create(&self, email: &str) -> Result<NewsletterSubscriber> {
        let now = Utc::now();
        let id = with_pool!(self.pool, conn => {
            sqlx::query(
                "INSERT INTO newsletter_subscribers (email, created_at, updated_at) VALUES (?, ?, ?)",
            )
            .bind(email)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create subscriber")?
            .insert_id()
        });
        Ok(NewsletterSubscriber {
            id,
            email: email.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<NewsletterSubscriber>> {
        let sql = format!(
            "SELECT {} FROM newsletter_subscribers WHERE id = ?",
            SUBSCRIBER_COLUMNS
        );
        let subscriber = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, NewsletterSubscriber>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get subscriber by ID")?
        });
        Ok(subscriber)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<NewsletterSubscriber>> {
        let sql = format!(
            "SELECT {} FROM newsletter_subscribers WHERE email = ?",
            SUBSCRIBER_COLUMNS
        );
        let subscriber = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, NewsletterSubscriber>(&sql)
                .bind(email)
                .fetch_optional(conn)
                .await
                .context("Failed to get subscriber by email")?
        });
        Ok(subscriber)
    }

    async fn list(&self, params: &ListParams) -> Result<PagedResult<NewsletterSubscriber>> {
        let sql = format!(
            "SELECT {} FROM newsletter_subscribers ORDER BY id ASC LIMIT ? OFFSET ?",
            SUBSCRIBER_COLUMNS
        );
        let (items, total) = with_pool!(self.pool, conn => {
            let items = sqlx::query_as::<_, NewsletterSubscriber>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list subscribers")?;
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM newsletter_subscribers")
                .fetch_one(conn)
                .await
                .context("Failed to count subscribers")?;
            (items, total)
        });
        Ok(PagedResult::new(items, total, params))
    }

    async fn update(&self, subscriber: &NewsletterSubscriber) -> Result<NewsletterSubscriber> {
        let now = Utc::now();
        with_pool!(self.pool, conn => {
            sqlx::query("UPDATE newsletter_subscribers SET email = ?, updated_at = ? WHERE id = ?")
                .bind(&subscriber.email)
                .bind(now)
                .bind(subscriber.id)
                .execute(conn)
                .await
                .context("Failed to update subscriber")?;
        });
        Ok(NewsletterSubscriber {
            updated_at: now,
            ..subscriber.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM newsletter_subscribers WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete subscriber")?;
        });
        Ok(())
    }
}

pub struct SqlxNoticeRepository {
    pool: DynDatabasePool,
}

impl SqlxNoticeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NoticeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NoticeRepository for SqlxNoticeRepository {
    async fn create(&self, notice: &NewsletterNotice) -> Result<NewsletterNotice> {
        let now = Utc::now();
        let look = &notice.appearance;
        let id = with_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                INSERT INTO newsletter_notices (subject, message, episode_id, archive_path, image_id, send_notice,
                    recipient_count, sent_at, background_color, text_color, button_color, button_text_color,
                    cta_label, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&notice.subject)
            .bind(&notice.message)
            .bind(notice.episode_id)
            .bind(&notice.archive_path)
            .bind(notice.image_id)
            .bind(notice.send_notice)
            .bind(notice.recipient_count)
            .bind(notice.sent_at)
            .bind(&look.background_color)
            .bind(&look.text_color)
            .bind(&look.button_color)
            .bind(&look.button_text_color)
            .bind(&look.cta_label)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create newsletter notice")?
            .insert_id()
        });
        Ok(NewsletterNotice {
            id,
            created_at: now,
            updated_at: now,
            ..notice.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<NewsletterNotice>> {
        let sql = format!(
            "SELECT {} FROM newsletter_notices WHERE id = ?",
            NOTICE_COLUMNS
        );
        let notice = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, NewsletterNotice>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get newsletter notice")?
        });
        Ok(notice)
    }

    async fn list(&self, params: &ListParams) -> Result<PagedResult<NewsletterNotice>> {
        let sql = format!(
            "SELECT {} FROM newsletter_notices ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            NOTICE_COLUMNS
        );
        let (items, total) = with_pool!(self.pool, conn => {
            let items = sqlx::query_as::<_, NewsletterNotice>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list newsletter notices")?;
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM newsletter_notices")
                .fetch_one(conn)
                .await
                .context("Failed to count newsletter notices")?;
            (items, total)
        });
        Ok(PagedResult::new(items, total, params))
    }

    async fn update(&self, notice: &NewsletterNotice) -> Result<NewsletterNotice> {
        let now = Utc::now();
        let look = &notice.appearance;
        with_pool!(self.pool, conn => {
            sqlx::query(
                r#"
                UPDATE newsletter_notices
                SET subject = ?, message = ?, episode_id = ?, archive_path = ?, image_id = ?, send_notice = ?,
                    recipient_count = ?, sent_at = ?, background_color = ?, text_color = ?, button_color = ?,
                    button_text_color = ?, cta_label = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&notice.subject)
            .bind(&notice.message)
            .bind(notice.episode_id)
            .bind(&notice.archive_path)
            .bind(notice.image_id)
            .bind(notice.send_notice)
            .bind(notice.recipient_count)
            .bind(notice.sent_at)
            .bind(&look.background_color)
            .bind(&look.text_color)
            .bind(&look.button_color)
            .bind(&look.button_text_color)
            .bind(&look.cta_label)
            .bind(now)
            .bind(notice.id)
            .execute(conn)
            .await
            .context("Failed to update newsletter notice")?;
        });
        Ok(NewsletterNotice {
            updated_at: now,
            ..notice.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM newsletter_notices WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete newsletter notice")?;
        });
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_notice(subject: &str) -> NewsletterNotice {
    let now = Utc::now();
    NewsletterNotice {
        id: 0,
        subject: subject.to_string(),
        message: "A new episode is live.".to_string(),
        episode_id: None,
        archive_path: crate::models::DEFAULT_ARCHIVE_PATH.to_string(),
        image_id: None,
        send_notice: false,
        recipient_count: 0,
        sent_at: None,
        appearance: Default::default(),
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_subscriber_email_is_unique() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxSubscriberRepository::new(pool);

        let created = repo.create("reader@example.com").await.unwrap();
        assert!(repo.create("reader@example.com").await.is_err());
        assert_eq!(
            repo.get_by_email("reader@example.com").await.unwrap().unwrap().id,
            created.id
        );
        assert!(repo.get_by_email("other@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscriber_list_pages_oldest_first() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxSubscriberRepository::new(pool);
        for i in 0..5 {
            repo.create(&format!("r{}@example.com", i)).await.unwrap();
        }

        let first = repo.list(&ListParams::new(1, 2)).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.items[0].email, "r0@example.com");
        let last = repo.list(&ListParams::new(3, 2)).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_next());

        let id = first.items[0].id;
        repo.delete(id).await.unwrap();
        assert!(repo.get_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notice_round_trip_keeps_appearance() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxNoticeRepository::new(pool);

        let mut notice = sample_notice("Episode 4 is up");
        notice.appearance.button_color = "#ff0066".to_string();
        let created = repo.create(&notice).await.unwrap();

        let mut found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.appearance.button_color, "#ff0066");
        assert_eq!(found.appearance.cta_label, "Read now");
        assert!(!found.send_notice);

        found.recipient_count = 12;
        found.sent_at = Some(Utc::now());
        repo.update(&found).await.unwrap();
        let sent = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(sent.recipient_count, 12);
        assert!(sent.sent_at.is_some());

        assert_eq!(repo.list(&ListParams::default()).await.unwrap().total, 1);
    }
}
