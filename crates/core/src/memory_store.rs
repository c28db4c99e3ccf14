//! In-process [`StateStore`] for tests. Post history is kept in full and
//! never pruned.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cursor::{DispatchState, VersionedState};
use crate::dispatch::{NewPublishedPost, PublishedPost, UnitPostCount};
use crate::ports::{DispatchLease, PersistenceError, StateStore};
use crate::types::{DbId, Timestamp};

#[derive(Debug)]
struct Record {
    current: VersionedState,
    lease: Option<(Uuid, Timestamp)>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, Record>,
    posts: Vec<PublishedPost>,
    next_post_id: DbId,
    unavailable: bool,
}

impl Inner {
    fn check_available(&self) -> Result<(), PersistenceError> {
        if self.unavailable {
            return Err(PersistenceError::Unavailable(
                "memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

/// Mutex-guarded map of bot records plus an append-only post history.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    inner: Mutex<Inner>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with an existing committed state for `bot_id`.
    pub fn with_state(bot_id: &str, current: VersionedState) -> Self {
        let mut inner = Inner::default();
        inner.records.insert(
            bot_id.to_string(),
            Record {
                current,
                lease: None,
            },
        );
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Make every subsequent call fail with
    /// [`PersistenceError::Unavailable`] until switched back.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    /// Whether a lease is currently recorded for `bot_id`, expired or not.
    pub async fn lease_held(&self, bot_id: &str) -> bool {
        self.inner
            .lock()
            .await
            .records
            .get(bot_id)
            .is_some_and(|r| r.lease.is_some())
    }

    /// Every stored post, oldest first.
    pub async fn all_posts(&self) -> Vec<PublishedPost> {
        self.inner.lock().await.posts.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, bot_id: &str) -> Result<Option<VersionedState>, PersistenceError> {
        let inner = self.inner.lock().await;
        inner.check_available()?;
        Ok(inner.records.get(bot_id).map(|r| r.current))
    }

    async fn try_acquire(
        &self,
        bot_id: &str,
        initial: &DispatchState,
        now: Timestamp,
        ttl: chrono::Duration,
    ) -> Result<Option<DispatchLease>, PersistenceError> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        let record = inner
            .records
            .entry(bot_id.to_string())
            .or_insert_with(|| Record {
                current: VersionedState {
                    state: *initial,
                    version: 0,
                },
                lease: None,
            });

        if matches!(record.lease, Some((_, expires_at)) if expires_at > now) {
            return Ok(None);
        }

        let token = Uuid::new_v4();
        let expires_at = now + ttl;
        record.lease = Some((token, expires_at));
        Ok(Some(DispatchLease {
            bot_id: bot_id.to_string(),
            token,
            expires_at,
            snapshot: record.current,
        }))
    }

    async fn commit(
        &self,
        lease: &DispatchLease,
        next: &DispatchState,
        post: &NewPublishedPost,
    ) -> Result<VersionedState, PersistenceError> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        let record = inner
            .records
            .get_mut(&lease.bot_id)
            .ok_or_else(|| PersistenceError::Conflict("state record missing".to_string()))?;

        if record.lease.map(|(token, _)| token) != Some(lease.token) {
            return Err(PersistenceError::Conflict("dispatch lease lost".to_string()));
        }
        if record.current.version != lease.snapshot.version {
            return Err(PersistenceError::Conflict(format!(
                "expected version {}, found {}",
                lease.snapshot.version, record.current.version
            )));
        }

        record.current = VersionedState {
            state: *next,
            version: record.current.version + 1,
        };
        record.lease = None;
        let committed = record.current;

        inner.next_post_id += 1;
        let id = inner.next_post_id;
        inner.posts.push(PublishedPost {
            id,
            bot_id: lease.bot_id.clone(),
            catalog_index: post.catalog_index,
            unit_slug: post.unit_slug.clone(),
            content: post.content.clone(),
            content_hash: post.content_hash.clone(),
            post_id: post.post_id.clone(),
            thread_post_ids: post.thread_post_ids.clone(),
            origin: post.origin,
            published_at: post.published_at,
        });

        Ok(committed)
    }

    async fn renew(
        &self,
        lease: &DispatchLease,
        until: Timestamp,
    ) -> Result<bool, PersistenceError> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;
        let Some(record) = inner.records.get_mut(&lease.bot_id) else {
            return Ok(false);
        };
        match &mut record.lease {
            Some((token, expires_at)) if *token == lease.token => {
                *expires_at = (*expires_at).max(until);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, lease: &DispatchLease) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;
        if let Some(record) = inner.records.get_mut(&lease.bot_id) {
            if record.lease.map(|(token, _)| token) == Some(lease.token) {
                record.lease = None;
            }
        }
        Ok(())
    }

    async fn recent_posts(
        &self,
        bot_id: &str,
        unit_slug: Option<&str>,
        limit: i64,
    ) -> Result<Vec<PublishedPost>, PersistenceError> {
        let inner = self.inner.lock().await;
        inner.check_available()?;
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(inner
            .posts
            .iter()
            .rev()
            .filter(|p| p.bot_id == bot_id)
            .filter(|p| unit_slug.is_none_or(|slug| p.unit_slug == slug))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn post_counts_since(
        &self,
        bot_id: &str,
        since: Timestamp,
    ) -> Result<Vec<UnitPostCount>, PersistenceError> {
        let inner = self.inner.lock().await;
        inner.check_available()?;

        let mut counts: HashMap<&str, i64> = HashMap::new();
        for post in inner
            .posts
            .iter()
            .filter(|p| p.bot_id == bot_id && p.published_at >= since)
        {
            *counts.entry(post.unit_slug.as_str()).or_default() += 1;
        }

        let mut out: Vec<UnitPostCount> = counts
            .into_iter()
            .map(|(slug, count)| UnitPostCount {
                unit_slug: slug.to_string(),
                count,
            })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count).then(a.unit_slug.cmp(&b.unit_slug)));
        Ok(out)
    }
}
