//! Collaborator seams of the dispatch loop.
//!
//! The pipeline only sees these traits: [`StateStore`] for the persisted
//! cursor, [`ContentGenerator`] for the text API and [`Publisher`] for the
//! social network. Production implementations live in the `db`, `gemini` and
//! `twitter` crates; tests plug in fakes.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::ContentUnit;
use crate::cursor::{DispatchState, VersionedState};
use crate::dispatch::{NewPublishedPost, PublishedPost, UnitPostCount};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure reported by the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Network, DNS or TLS failure before a response arrived.
    #[error("generation request failed: {message}")]
    Transport { message: String },

    #[error("generation request timed out after {0:?}")]
    TimedOut(Duration),

    /// The service answered with a non-2xx status.
    #[error("generation service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The service answered but the text is unusable.
    #[error("generation output unusable: {0}")]
    Malformed(String),

    #[error("generated content repeats a recent post")]
    Duplicate,
}

impl GenerationError {
    /// Whether a single retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::TimedOut(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::Malformed(_) | Self::Duplicate => false,
        }
    }
}

/// Failure reported by the publisher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("publish request failed: {message}")]
    Transport { message: String },

    #[error("publish request timed out after {0:?}")]
    TimedOut(Duration),

    /// The platform throttled us. Never retried in-process.
    #[error("publisher rate limit reached")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The platform refused the content (duplicate, too long, forbidden...).
    #[error("publisher rejected the post with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The post could not be sent at all (e.g. empty segment list).
    #[error("invalid post: {0}")]
    Invalid(String),
}

impl PublishError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::TimedOut(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::RateLimited { .. } | Self::Invalid(_) => false,
        }
    }
}

/// Failure of the state store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    /// Optimistic-lock or lease check failed on write.
    #[error("state write conflict: {0}")]
    Conflict(String),
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Input for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub unit: ContentUnit,
    pub prompt: String,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Produce raw text for the unit. Shaping happens in the caller.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

/// What the publisher reports back after a post went out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Identifier of the first (or only) post.
    pub post_id: String,
    /// Identifiers of every published segment, in order.
    pub thread_post_ids: Vec<String>,
    /// `false` when a thread stopped after its first segment went out.
    pub complete: bool,
}

/// One request against the social network. Threads are chained by the
/// caller, so every call is a single side effect.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Post `text`, as a reply to `in_reply_to` when set. Returns the new
    /// post id.
    async fn post_segment(
        &self,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<String, PublishError>;
}

// ---------------------------------------------------------------------------
// State store
// ---------------------------------------------------------------------------

/// Exclusive, expiring claim on one bot's state record.
///
/// Held for the duration of a dispatch attempt. Only the holder may commit,
/// and only against the version it leased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchLease {
    pub bot_id: String,
    pub token: Uuid,
    pub expires_at: Timestamp,
    /// State as it was when the lease was granted.
    pub snapshot: VersionedState,
}

/// Transactional access to the persisted cursor and post history.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Last committed state, `None` if the bot never ran.
    async fn load(&self, bot_id: &str) -> Result<Option<VersionedState>, PersistenceError>;

    /// Claim the record for `ttl`, creating it from `initial` if absent.
    ///
    /// Returns `None` while another unexpired lease is held.
    async fn try_acquire(
        &self,
        bot_id: &str,
        initial: &DispatchState,
        now: Timestamp,
        ttl: chrono::Duration,
    ) -> Result<Option<DispatchLease>, PersistenceError>;

    /// Atomically write `next`, append `post` to the history and drop the
    /// lease. Fails with [`PersistenceError::Conflict`] if the lease was lost
    /// or the version moved.
    async fn commit(
        &self,
        lease: &DispatchLease,
        next: &DispatchState,
        post: &NewPublishedPost,
    ) -> Result<VersionedState, PersistenceError>;

    /// Push the lease expiry out to at least `until` while this lease still
    /// holds the record. Returns `false` once it was released or taken over.
    async fn renew(
        &self,
        lease: &DispatchLease,
        until: Timestamp,
    ) -> Result<bool, PersistenceError>;

    /// Drop the lease without touching the state. Releasing a lease that
    /// already expired or was taken over is not an error.
    async fn release(&self, lease: &DispatchLease) -> Result<(), PersistenceError>;

    /// Most recent posts first, optionally for a single unit.
    async fn recent_posts(
        &self,
        bot_id: &str,
        unit_slug: Option<&str>,
        limit: i64,
    ) -> Result<Vec<PublishedPost>, PersistenceError>;

    /// Posts per unit published at or after `since`, busiest first.
    async fn post_counts_since(
        &self,
        bot_id: &str,
        since: Timestamp,
    ) -> Result<Vec<UnitPostCount>, PersistenceError>;
}
