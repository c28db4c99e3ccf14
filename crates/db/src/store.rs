//! [`StateStore`] backed by PostgreSQL.

use async_trait::async_trait;
use chaincast_core::cursor::{DispatchState, VersionedState};
use chaincast_core::dispatch::{NewPublishedPost, PublishedPost, UnitPostCount};
use chaincast_core::error::CoreError;
use chaincast_core::ports::{DispatchLease, PersistenceError, StateStore};
use chaincast_core::types::Timestamp;
use uuid::Uuid;

use crate::models::dispatch_state::StateColumns;
use crate::repositories::{DispatchStateRepo, PublishedPostRepo};
use crate::DbPool;

fn unavailable(err: sqlx::Error) -> PersistenceError {
    PersistenceError::Unavailable(err.to_string())
}

fn corrupt(err: CoreError) -> PersistenceError {
    PersistenceError::Unavailable(format!("stored state is invalid: {err}"))
}

/// Durable state store. Cheap to clone; shares the pool.
#[derive(Debug, Clone)]
pub struct PgStateStore {
    pool: DbPool,
}

impl PgStateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn load(&self, bot_id: &str) -> Result<Option<VersionedState>, PersistenceError> {
        DispatchStateRepo::find(&self.pool, bot_id)
            .await
            .map_err(unavailable)?
            .map(|row| row.to_versioned().map_err(corrupt))
            .transpose()
    }

    async fn try_acquire(
        &self,
        bot_id: &str,
        initial: &DispatchState,
        now: Timestamp,
        ttl: chrono::Duration,
    ) -> Result<Option<DispatchLease>, PersistenceError> {
        let columns = StateColumns::try_from(initial).map_err(corrupt)?;
        if DispatchStateRepo::insert_if_absent(&self.pool, bot_id, &columns)
            .await
            .map_err(unavailable)?
        {
            tracing::info!(bot_id, "Created initial dispatch state");
        }

        let token = Uuid::new_v4();
        let expires_at = now + ttl;
        let Some(row) = DispatchStateRepo::try_lease(&self.pool, bot_id, token, now, expires_at)
            .await
            .map_err(unavailable)?
        else {
            return Ok(None);
        };

        Ok(Some(DispatchLease {
            bot_id: bot_id.to_string(),
            token,
            expires_at,
            snapshot: row.to_versioned().map_err(corrupt)?,
        }))
    }

    async fn commit(
        &self,
        lease: &DispatchLease,
        next: &DispatchState,
        post: &NewPublishedPost,
    ) -> Result<VersionedState, PersistenceError> {
        let columns = StateColumns::try_from(next).map_err(corrupt)?;
        let catalog_index = i32::try_from(post.catalog_index)
            .map_err(|_| corrupt(CoreError::Validation("catalog index out of range".into())))?;

        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let Some(row) = DispatchStateRepo::advance(
            &mut tx,
            &lease.bot_id,
            lease.token,
            lease.snapshot.version,
            &columns,
        )
        .await
        .map_err(unavailable)?
        else {
            // Dropping the transaction rolls it back.
            return Err(PersistenceError::Conflict(format!(
                "lease {} lost or version {} superseded",
                lease.token, lease.snapshot.version
            )));
        };

        PublishedPostRepo::insert(&mut tx, &lease.bot_id, catalog_index, post)
            .await
            .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)?;
        row.to_versioned().map_err(corrupt)
    }

    async fn renew(
        &self,
        lease: &DispatchLease,
        until: Timestamp,
    ) -> Result<bool, PersistenceError> {
        DispatchStateRepo::extend_lease(&self.pool, &lease.bot_id, lease.token, until)
            .await
            .map_err(unavailable)
    }

    async fn release(&self, lease: &DispatchLease) -> Result<(), PersistenceError> {
        let released = DispatchStateRepo::release(&self.pool, &lease.bot_id, lease.token)
            .await
            .map_err(unavailable)?;
        if !released {
            tracing::debug!(bot_id = %lease.bot_id, token = %lease.token, "Lease already gone");
        }
        Ok(())
    }

    async fn recent_posts(
        &self,
        bot_id: &str,
        unit_slug: Option<&str>,
        limit: i64,
    ) -> Result<Vec<PublishedPost>, PersistenceError> {
        PublishedPostRepo::list_recent(&self.pool, bot_id, unit_slug, limit)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|row| PublishedPost::try_from(row).map_err(corrupt))
            .collect()
    }

    async fn post_counts_since(
        &self,
        bot_id: &str,
        since: Timestamp,
    ) -> Result<Vec<UnitPostCount>, PersistenceError> {
        Ok(PublishedPostRepo::counts_since(&self.pool, bot_id, since)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(UnitPostCount::from)
            .collect())
    }
}
