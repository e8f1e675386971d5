//! Episode repository
//!
//! Episodes and their pages are written together in one transaction, so a
//! reader never sees an episode whose page list is half replaced.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{
    Episode, EpisodePage, EpisodePageInput, EpisodeSort, EpisodeWithPages, ListParams,
    PagedResult,
};
use crate::with_pool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use super::contains_pattern;
use super::media::placeholders;

const EPISODE_COLUMNS: &str = "id, title, slug, episode_number, chapter_id, publish_date, thumbnail_id, author_notes, seo_title, seo_description, created_at, updated_at";

const PAGE_COLUMNS: &str = "id, episode_id, position, image_id, alt_text, page_title, caption";

#[async_trait]
pub trait EpisodeRepository: Send + Sync {
    /// Insert an episode with its pages
    async fn create(&self, episode: &Episode, pages: &[EpisodePageInput])
        -> Result<EpisodeWithPages>;

    /// Update an episode; `pages`, when given, replaces every page
    async fn update(
        &self,
        episode: &Episode,
        pages: Option<&[EpisodePageInput]>,
    ) -> Result<EpisodeWithPages>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn get_by_id(&self, id: i64) -> Result<Option<EpisodeWithPages>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<EpisodeWithPages>>;

    async fn get_by_number(&self, episode_number: i64) -> Result<Option<Episode>>;

    async fn list(&self, sort: EpisodeSort, params: &ListParams) -> Result<PagedResult<Episode>>;

    /// Highest-numbered episode
    async fn latest(&self) -> Result<Option<EpisodeWithPages>>;

    /// Episode with the smallest number greater than `episode_number`
    async fn next_after(&self, episode_number: i64) -> Result<Option<Episode>>;

    /// Image of page 1 for each of the given episodes
    async fn first_page_images(&self, episode_ids: &[i64]) -> Result<HashMap<i64, i64>>;

    /// Case-insensitive substring match on title, slug and SEO fields,
    /// newest number first. An empty term matches everything.
    async fn search(&self, term: &str, limit: i64) -> Result<Vec<Episode>>;
}

pub struct SqlxEpisodeRepository {
    pool: DynDatabasePool,
}

impl SqlxEpisodeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EpisodeRepository> {
        Arc::new(Self::new(pool))
    }

    async fn load_pages(&self, episode: Episode) -> Result<EpisodeWithPages> {
        let sql = format!(
            "SELECT {} FROM episode_pages WHERE episode_id = ? ORDER BY position ASC",
            PAGE_COLUMNS
        );
        let pages = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, EpisodePage>(&sql)
                .bind(episode.id)
                .fetch_all(conn)
                .await
                .context("Failed to load episode pages")?
        });
        Ok(EpisodeWithPages { episode, pages })
    }

    async fn fetch_one_where(&self, clause: &str, bind: EpisodeBind<'_>) -> Result<Option<Episode>> {
        let sql = format!("SELECT {} FROM episodes {}", EPISODE_COLUMNS, clause);
        let episode = with_pool!(self.pool, conn => {
            let query = sqlx::query_as::<_, Episode>(&sql);
            let query = match bind {
                EpisodeBind::None => query,
                EpisodeBind::Int(v) => query.bind(v),
                EpisodeBind::Text(v) => query.bind(v),
            };
            query
                .fetch_optional(conn)
                .await
                .context("Failed to get episode")?
        });
        Ok(episode)
    }
}

#[derive(Clone, Copy)]
enum EpisodeBind<'a> {
    None,
    Int(i64),
    Text(&'a str),
}

fn page_rows(episode_id: i64, pages: &[EpisodePageInput]) -> Vec<EpisodePage> {
    pages
        .iter()
        .enumerate()
        .map(|(idx, page)| EpisodePage {
            id: 0,
            episode_id,
            position: idx as i64 + 1,
            image_id: page.image_id,
            alt_text: page.alt_text.clone(),
            page_title: page.page_title.clone(),
            caption: page.caption.clone(),
        })
        .collect()
}

#[async_trait]
impl EpisodeRepository for SqlxEpisodeRepository {
    async fn create(
        &self,
        episode: &Episode,
        pages: &[EpisodePageInput],
    ) -> Result<EpisodeWithPages> {
        let now = Utc::now();
        let mut rows = Vec::new();

        let id = with_pool!(self.pool, conn => {
            let mut tx = conn.begin().await.context("Failed to begin transaction")?;

            let id = sqlx::query(
                r#"
                INSERT INTO episodes (title, slug, episode_number, chapter_id, publish_date, thumbnail_id,
                    author_notes, seo_title, seo_description, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&episode.title)
            .bind(&episode.slug)
            .bind(episode.episode_number)
            .bind(episode.chapter_id)
            .bind(episode.publish_date)
            .bind(episode.thumbnail_id)
            .bind(&episode.author_notes)
            .bind(&episode.seo_title)
            .bind(&episode.seo_description)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to create episode")?
            .insert_id();

            for mut page in page_rows(id, pages) {
                page.id = sqlx::query(
                    "INSERT INTO episode_pages (episode_id, position, image_id, alt_text, page_title, caption) VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(page.episode_id)
                .bind(page.position)
                .bind(page.image_id)
                .bind(&page.alt_text)
                .bind(&page.page_title)
                .bind(&page.caption)
                .execute(&mut *tx)
                .await
                .context("Failed to create episode page")?
                .insert_id();
                rows.push(page);
            }

            tx.commit().await.context("Failed to commit episode")?;
            id
        });

        Ok(EpisodeWithPages {
            episode: Episode {
                id,
                created_at: now,
                updated_at: now,
                ..episode.clone()
            },
            pages: rows,
        })
    }

    async fn update(
        &self,
        episode: &Episode,
        pages: Option<&[EpisodePageInput]>,
    ) -> Result<EpisodeWithPages> {
        let now = Utc::now();

        with_pool!(self.pool, conn => {
            let mut tx = conn.begin().await.context("Failed to begin transaction")?;

            sqlx::query(
                r#"
                UPDATE episodes
                SET title = ?, slug = ?, episode_number = ?, chapter_id = ?, publish_date = ?,
                    thumbnail_id = ?, author_notes = ?, seo_title = ?, seo_description = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&episode.title)
            .bind(&episode.slug)
            .bind(episode.episode_number)
            .bind(episode.chapter_id)
            .bind(episode.publish_date)
            .bind(episode.thumbnail_id)
            .bind(&episode.author_notes)
            .bind(&episode.seo_title)
            .bind(&episode.seo_description)
            .bind(now)
            .bind(episode.id)
            .execute(&mut *tx)
            .await
            .context("Failed to update episode")?;

            if let Some(pages) = pages {
                sqlx::query("DELETE FROM episode_pages WHERE episode_id = ?")
                    .bind(episode.id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to clear episode pages")?;

                for page in page_rows(episode.id, pages) {
                    sqlx::query(
                        "INSERT INTO episode_pages (episode_id, position, image_id, alt_text, page_title, caption) VALUES (?, ?, ?, ?, ?, ?)",
                    )
                    .bind(page.episode_id)
                    .bind(page.position)
                    .bind(page.image_id)
                    .bind(&page.alt_text)
                    .bind(&page.page_title)
                    .bind(&page.caption)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to create episode page")?;
                }
            }

            tx.commit().await.context("Failed to commit episode")?;
        });

        self.load_pages(Episode {
            updated_at: now,
            ..episode.clone()
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM episodes WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete episode")?;
        });
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<EpisodeWithPages>> {
        match self.fetch_one_where("WHERE id = ?", EpisodeBind::Int(id)).await? {
            Some(episode) => Ok(Some(self.load_pages(episode).await?)),
            None => Ok(None),
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<EpisodeWithPages>> {
        match self
            .fetch_one_where("WHERE slug = ?", EpisodeBind::Text(slug))
            .await?
        {
            Some(episode) => Ok(Some(self.load_pages(episode).await?)),
            None => Ok(None),
        }
    }

    async fn get_by_number(&self, episode_number: i64) -> Result<Option<Episode>> {
        self.fetch_one_where("WHERE episode_number = ?", EpisodeBind::Int(episode_number))
            .await
    }

    async fn list(&self, sort: EpisodeSort, params: &ListParams) -> Result<PagedResult<Episode>> {
        let sql = format!(
            "SELECT {} FROM episodes ORDER BY {} LIMIT ? OFFSET ?",
            EPISODE_COLUMNS,
            sort.sql()
        );
        let (items, total) = with_pool!(self.pool, conn => {
            let items = sqlx::query_as::<_, Episode>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list episodes")?;
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM episodes")
                .fetch_one(conn)
                .await
                .context("Failed to count episodes")?;
            (items, total)
        });
        Ok(PagedResult::new(items, total, params))
    }

    async fn latest(&self) -> Result<Option<EpisodeWithPages>> {
        match self
            .fetch_one_where("ORDER BY episode_number DESC LIMIT 1", EpisodeBind::None)
            .await?
        {
            Some(episode) => Ok(Some(self.load_pages(episode).await?)),
            None => Ok(None),
        }
    }

    async fn next_after(&self, episode_number: i64) -> Result<Option<Episode>> {
        self.fetch_one_where(
            "WHERE episode_number > ? ORDER BY episode_number ASC LIMIT 1",
            EpisodeBind::Int(episode_number),
        )
        .await
    }

    async fn first_page_images(&self, episode_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if episode_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT episode_id, image_id FROM episode_pages WHERE position = 1 AND episode_id IN ({})",
            placeholders(episode_ids.len())
        );
        let rows = with_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, (i64, i64)>(&sql);
            for id in episode_ids {
                query = query.bind(*id);
            }
            query
                .fetch_all(conn)
                .await
                .context("Failed to load first episode pages")?
        });
        Ok(rows.into_iter().collect())
    }

    async fn search(&self, term: &str, limit: i64) -> Result<Vec<Episode>> {
        let pattern = contains_pattern(term);
        let sql = format!(
            r#"
            SELECT {} FROM episodes
            WHERE LOWER(title) LIKE ? ESCAPE '!' OR LOWER(slug) LIKE ? ESCAPE '!'
               OR LOWER(COALESCE(seo_title, '')) LIKE ? ESCAPE '!'
               OR LOWER(COALESCE(seo_description, '')) LIKE ? ESCAPE '!'
            ORDER BY episode_number DESC
            LIMIT ?
            "#,
            EPISODE_COLUMNS
        );
        let episodes = with_pool!(self.pool, conn => {
            sqlx::query_as::<_, Episode>(&sql)
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .fetch_all(conn)
                .await
                .context("Failed to search episodes")?
        });
        Ok(episodes)
    }
}

#[cfg(test)]
pub(crate) fn sample_episode(number: i64) -> Episode {
    let now = Utc::now();
    Episode {
        id: 0,
        title: format!("Episode {}", number),
        slug: format!("episode-{}", number),
        episode_number: number,
        chapter_id: None,
        publish_date: now,
        thumbnail_id: None,
        author_notes: None,
        seo_title: None,
        seo_description: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::media::media_input;
    use crate::db::repositories::{MediaRepository, SqlxMediaRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (SqlxEpisodeRepository, Vec<i64>) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let media = SqlxMediaRepository::new(pool.clone());
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(media.create(&media_input(&format!("p{}.png", i))).await.unwrap().id);
        }
        (SqlxEpisodeRepository::new(pool), ids)
    }

    fn pages(images: &[i64]) -> Vec<EpisodePageInput> {
        images
            .iter()
            .map(|id| EpisodePageInput {
                image_id: *id,
                alt_text: None,
                page_title: None,
                caption: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_assigns_page_positions() {
        let (repo, media) = setup().await;
        let created = repo
            .create(&sample_episode(1), &pages(&media))
            .await
            .unwrap();
        assert_eq!(created.pages.len(), 3);

        let loaded = repo.get_by_slug("episode-1").await.unwrap().unwrap();
        let positions: Vec<i64> = loaded.pages.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(loaded.pages[2].image_id, media[2]);
    }

    #[tokio::test]
    async fn test_update_replaces_pages_only_when_given() {
        let (repo, media) = setup().await;
        let created = repo
            .create(&sample_episode(1), &pages(&media))
            .await
            .unwrap();

        let mut episode = created.episode.clone();
        episode.title = "Renamed".to_string();
        let unchanged = repo.update(&episode, None).await.unwrap();
        assert_eq!(unchanged.pages.len(), 3);
        assert_eq!(unchanged.episode.title, "Renamed");

        let replaced = repo
            .update(&episode, Some(&pages(&media[..1])))
            .await
            .unwrap();
        assert_eq!(replaced.pages.len(), 1);
        assert_eq!(replaced.pages[0].position, 1);
    }

    #[tokio::test]
    async fn test_latest_next_and_sorting() {
        let (repo, media) = setup().await;
        for number in [2, 5, 1] {
            repo.create(&sample_episode(number), &pages(&media[..1]))
                .await
                .unwrap();
        }

        let latest = repo.latest().await.unwrap().unwrap();
        assert_eq!(latest.episode.episode_number, 5);

        assert_eq!(repo.next_after(1).await.unwrap().unwrap().episode_number, 2);
        assert_eq!(repo.next_after(2).await.unwrap().unwrap().episode_number, 5);
        assert!(repo.next_after(5).await.unwrap().is_none());

        let desc = repo
            .list(EpisodeSort::NumberDesc, &ListParams::new(1, 100))
            .await
            .unwrap();
        let numbers: Vec<i64> = desc.items.iter().map(|e| e.episode_number).collect();
        assert_eq!(numbers, vec![5, 2, 1]);
    }

    #[tokio::test]
    async fn test_first_page_images_and_delete_cascade() {
        let (repo, media) = setup().await;
        let a = repo.create(&sample_episode(1), &pages(&media[1..])).await.unwrap();
        let b = repo.create(&sample_episode(2), &pages(&media[..1])).await.unwrap();

        let firsts = repo
            .first_page_images(&[a.episode.id, b.episode.id])
            .await
            .unwrap();
        assert_eq!(firsts[&a.episode.id], media[1]);
        assert_eq!(firsts[&b.episode.id], media[0]);

        repo.delete(a.episode.id).await.unwrap();
        assert!(repo.get_by_id(a.episode.id).await.unwrap().is_none());
        assert!(repo.first_page_images(&[a.episode.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_matches_title_and_seo_fields() {
        let (repo, media) = setup().await;
        let mut gate = sample_episode(1);
        gate.title = "The Gate".to_string();
        let mut storm = sample_episode(2);
        storm.seo_description = Some("A storm over the GATE city".to_string());
        repo.create(&gate, &pages(&media[..1])).await.unwrap();
        repo.create(&storm, &pages(&media[..1])).await.unwrap();
        repo.create(&sample_episode(3), &pages(&media[..1])).await.unwrap();

        let found = repo.search("gate", 12).await.unwrap();
        let numbers: Vec<i64> = found.iter().map(|e| e.episode_number).collect();
        assert_eq!(numbers, vec![2, 1]);

        assert_eq!(repo.search("", 12).await.unwrap().len(), 3);
        assert!(repo.search("%", 12).await.unwrap().is_empty());
        assert!(repo.search("g_te", 12).await.unwrap().is_empty());
    }
}
