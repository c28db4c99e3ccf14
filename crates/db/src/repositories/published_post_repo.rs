//! Repository for the `published_posts` table.

use chaincast_core::dispatch::NewPublishedPost;
use chaincast_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::published_post::{PublishedPostRow, UnitPostCountRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, bot_id, catalog_index, unit_slug, content, content_hash, \
    post_id, thread_post_ids, origin, published_at, created_at";

/// Append-only access to the post history.
pub struct PublishedPostRepo;

impl PublishedPostRepo {
    /// Insert a history row inside the commit transaction.
    pub async fn insert(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        bot_id: &str,
        catalog_index: i32,
        post: &NewPublishedPost,
    ) -> Result<PublishedPostRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO published_posts \
                (bot_id, catalog_index, unit_slug, content, content_hash, \
                 post_id, thread_post_ids, origin, published_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PublishedPostRow>(&query)
            .bind(bot_id)
            .bind(catalog_index)
            .bind(&post.unit_slug)
            .bind(&post.content)
            .bind(&post.content_hash)
            .bind(&post.post_id)
            .bind(&post.thread_post_ids)
            .bind(post.origin.as_str())
            .bind(post.published_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Newest posts first, optionally restricted to one unit.
    pub async fn list_recent(
        pool: &PgPool,
        bot_id: &str,
        unit_slug: Option<&str>,
        limit: i64,
    ) -> Result<Vec<PublishedPostRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM published_posts \
             WHERE bot_id = $1 AND ($2::TEXT IS NULL OR unit_slug = $2) \
             ORDER BY published_at DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, PublishedPostRow>(&query)
            .bind(bot_id)
            .bind(unit_slug)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Posts per unit since `since`, busiest first.
    pub async fn counts_since(
        pool: &PgPool,
        bot_id: &str,
        since: Timestamp,
    ) -> Result<Vec<UnitPostCountRow>, sqlx::Error> {
        sqlx::query_as::<_, UnitPostCountRow>(
            "SELECT unit_slug, COUNT(*) AS count FROM published_posts \
             WHERE bot_id = $1 AND published_at >= $2 \
             GROUP BY unit_slug \
             ORDER BY count DESC, unit_slug ASC",
        )
        .bind(bot_id)
        .bind(since)
        .fetch_all(pool)
        .await
    }
}
