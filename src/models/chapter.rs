//! Chapter model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Chapter {
    pub id: i64,
    pub title: String,
    pub slug: String,
    /// Reading order (unique, starts at 1)
    pub chapter_number: i64,
    pub description: Option<String>,
    /// Owning book; cleared when the book is deleted
    pub book_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChapterInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub chapter_number: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub book_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateChapterInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub chapter_number: Option<i64>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub book_id: Option<Option<i64>>,
}
