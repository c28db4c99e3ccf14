//! Results of a dispatch attempt and the post-history records it produces.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::ContentUnit;
use crate::cursor::VersionedState;
use crate::error::CoreError;
use crate::ports::{GenerationError, PersistenceError, PublishError};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Content origin
// ---------------------------------------------------------------------------

/// Whether the published text came from the generator or the fallback
/// template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentOrigin {
    Generated,
    Fallback,
}

impl ContentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Fallback => "fallback",
        }
    }
}

impl FromStr for ContentOrigin {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(Self::Generated),
            "fallback" => Ok(Self::Fallback),
            other => Err(CoreError::Validation(format!(
                "unknown content origin '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Post history
// ---------------------------------------------------------------------------

/// History row written together with the state advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPublishedPost {
    pub catalog_index: usize,
    pub unit_slug: String,
    pub content: String,
    pub content_hash: String,
    pub post_id: String,
    pub thread_post_ids: Vec<String>,
    pub origin: ContentOrigin,
    pub published_at: Timestamp,
}

/// A stored history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedPost {
    pub id: DbId,
    pub bot_id: String,
    pub catalog_index: usize,
    pub unit_slug: String,
    pub content: String,
    pub content_hash: String,
    pub post_id: String,
    pub thread_post_ids: Vec<String>,
    pub origin: ContentOrigin,
    pub published_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitPostCount {
    pub unit_slug: String,
    pub count: i64,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A dispatch that published and committed.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedDispatch {
    pub index: usize,
    pub unit: ContentUnit,
    /// Full published text (segments separated by a blank line).
    pub content: String,
    pub segments: Vec<String>,
    /// Hashtags and @mentions found in the published text.
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub post_id: String,
    pub thread_post_ids: Vec<String>,
    pub origin: ContentOrigin,
    /// `false` when only part of a thread went out.
    pub complete: bool,
    pub published_at: Timestamp,
    /// State as committed.
    pub state: VersionedState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitReason {
    /// The configured budget for the current window is used up.
    WindowExhausted,
    /// Another invocation holds the dispatch lease.
    DispatchInFlight,
    /// The publisher answered with its own rate-limit rejection.
    PublisherThrottled,
}

/// A dispatch that was deferred. State is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitedDispatch {
    pub reason: RateLimitReason,
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Published(PublishedDispatch),
    RateLimited(RateLimitedDispatch),
}

/// A dispatch that failed. State is unchanged.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("generation failed for catalog index {index}: {source}")]
    Generation {
        index: usize,
        #[source]
        source: GenerationError,
    },

    #[error("publish failed for catalog index {index}: {source}")]
    Publish {
        index: usize,
        #[source]
        source: PublishError,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl DispatchError {
    /// Stable machine-readable kind for API responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generation { .. } => "generation_failure",
            Self::Publish { .. } => "publish_failure",
            Self::Persistence(_) => "persistence_failure",
        }
    }
}

pub type DispatchResult = Result<DispatchOutcome, DispatchError>;
