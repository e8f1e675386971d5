//! Category model
//!
//! Flat post categories. Each category has a public listing at
//! `/categories/{slug}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Public listing path
    pub fn path(&self) -> String {
        format!("/categories/{}", self.slug)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryInput {
    pub title: Option<String>,
    pub slug: Option<String>,
}
