//! Repository for the `dispatch_state` table.
//!
//! Concurrency lives in the SQL: a lease is granted by a conditional `UPDATE`
//! that only matches when no live lease exists, and an advance only matches
//! the row when both the lease token and the version are still the ones the
//! caller saw.

use chaincast_core::types::Timestamp;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::dispatch_state::{DispatchStateRow, StateColumns};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    bot_id, last_index, last_dispatch_at, window_count, window_start, \
    version, lease_token, lease_expires_at, created_at, updated_at";

/// Provides lease and cursor operations on a bot's state row.
pub struct DispatchStateRepo;

impl DispatchStateRepo {
    /// Find a bot's state row.
    pub async fn find(pool: &PgPool, bot_id: &str) -> Result<Option<DispatchStateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dispatch_state WHERE bot_id = $1");
        sqlx::query_as::<_, DispatchStateRow>(&query)
            .bind(bot_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert the initial row unless one already exists.
    ///
    /// Returns `true` when this call created it.
    pub async fn insert_if_absent(
        pool: &PgPool,
        bot_id: &str,
        initial: &StateColumns,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO dispatch_state \
                (bot_id, last_index, last_dispatch_at, window_count, window_start) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (bot_id) DO NOTHING",
        )
        .bind(bot_id)
        .bind(initial.last_index)
        .bind(initial.last_dispatch_at)
        .bind(initial.window_count)
        .bind(initial.window_start)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Grant a lease when none is held or the held one expired at `now`.
    ///
    /// Returns the leased row, or `None` if another lease is live.
    pub async fn try_lease(
        pool: &PgPool,
        bot_id: &str,
        token: Uuid,
        now: Timestamp,
        expires_at: Timestamp,
    ) -> Result<Option<DispatchStateRow>, sqlx::Error> {
        let query = format!(
            "UPDATE dispatch_state \
             SET lease_token = $2, lease_expires_at = $3, updated_at = NOW() \
             WHERE bot_id = $1 \
               AND (lease_token IS NULL OR lease_expires_at <= $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DispatchStateRow>(&query)
            .bind(bot_id)
            .bind(token)
            .bind(expires_at)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Write the advanced cursor, bump the version and clear the lease.
    ///
    /// Matches only while `token` still holds the lease and the version is
    /// `expected_version`. Returns `None` otherwise.
    pub async fn advance(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        bot_id: &str,
        token: Uuid,
        expected_version: i64,
        next: &StateColumns,
    ) -> Result<Option<DispatchStateRow>, sqlx::Error> {
        let query = format!(
            "UPDATE dispatch_state SET \
                last_index = $4, \
                last_dispatch_at = $5, \
                window_count = $6, \
                window_start = $7, \
                version = version + 1, \
                lease_token = NULL, \
                lease_expires_at = NULL, \
                updated_at = NOW() \
             WHERE bot_id = $1 AND lease_token = $2 AND version = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DispatchStateRow>(&query)
            .bind(bot_id)
            .bind(token)
            .bind(expected_version)
            .bind(next.last_index)
            .bind(next.last_dispatch_at)
            .bind(next.window_count)
            .bind(next.window_start)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Move the lease expiry to at least `until` if `token` still holds it.
    /// Returns `true` if the lease was extended.
    pub async fn extend_lease(
        pool: &PgPool,
        bot_id: &str,
        token: Uuid,
        until: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE dispatch_state \
             SET lease_expires_at = GREATEST(lease_expires_at, $3), updated_at = NOW() \
             WHERE bot_id = $1 AND lease_token = $2",
        )
        .bind(bot_id)
        .bind(token)
        .bind(until)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear the lease if `token` still holds it. Returns `true` if cleared.
    pub async fn release(pool: &PgPool, bot_id: &str, token: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE dispatch_state \
             SET lease_token = NULL, lease_expires_at = NULL, updated_at = NOW() \
             WHERE bot_id = $1 AND lease_token = $2",
        )
        .bind(bot_id)
        .bind(token)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
