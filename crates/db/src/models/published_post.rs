//! Maps to the `published_posts` table.

use chaincast_core::dispatch::{PublishedPost, UnitPostCount};
use chaincast_core::error::CoreError;
use chaincast_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `published_posts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PublishedPostRow {
    pub id: DbId,
    pub bot_id: String,
    pub catalog_index: i32,
    pub unit_slug: String,
    pub content: String,
    pub content_hash: String,
    pub post_id: String,
    pub thread_post_ids: Vec<String>,
    pub origin: String,
    pub published_at: Timestamp,
    pub created_at: Timestamp,
}

impl TryFrom<PublishedPostRow> for PublishedPost {
    type Error = CoreError;

    fn try_from(row: PublishedPostRow) -> Result<Self, Self::Error> {
        Ok(PublishedPost {
            id: row.id,
            bot_id: row.bot_id,
            catalog_index: usize::try_from(row.catalog_index).map_err(|_| {
                CoreError::Validation(format!("negative catalog_index {}", row.catalog_index))
            })?,
            unit_slug: row.unit_slug,
            content: row.content,
            content_hash: row.content_hash,
            post_id: row.post_id,
            thread_post_ids: row.thread_post_ids,
            origin: row.origin.parse()?,
            published_at: row.published_at,
        })
    }
}

/// Aggregate row for per-unit post counts.
#[derive(Debug, Clone, FromRow)]
pub struct UnitPostCountRow {
    pub unit_slug: String,
    pub count: i64,
}

impl From<UnitPostCountRow> for UnitPostCount {
    fn from(row: UnitPostCountRow) -> Self {
        UnitPostCount {
            unit_slug: row.unit_slug,
            count: row.count,
        }
    }
}
