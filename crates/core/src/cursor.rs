//! Dispatch cursor: catalog rotation and fixed-window rate limiting.
//!
//! Everything here is a pure function over [`DispatchState`]. The pipeline
//! loads the persisted state, asks [`check_rate_limit`] whether a dispatch may
//! run, picks the unit with [`select_next`], and only after a successful
//! publish persists the result of [`record_dispatch`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The persisted cursor of one bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchState {
    /// Catalog position of the last published unit.
    pub last_index: usize,
    /// When the last successful dispatch was recorded.
    pub last_dispatch_at: Option<Timestamp>,
    /// Dispatches recorded in the current rate window.
    pub window_count: u32,
    /// Start of the current rate window.
    pub window_start: Timestamp,
}

impl DispatchState {
    /// State of a bot that has never dispatched.
    ///
    /// `last_index` points at the final unit so the first rotation lands on
    /// index 0. The window is empty and starts at the epoch, which makes it
    /// expired for any real clock.
    pub fn initial(catalog_size: usize) -> Self {
        Self {
            last_index: catalog_size.saturating_sub(1),
            last_dispatch_at: None,
            window_count: 0,
            window_start: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// A [`DispatchState`] together with the store's optimistic-lock version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedState {
    pub state: DispatchState,
    /// Incremented by the store on every committed dispatch.
    pub version: i64,
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// At most `limit` dispatches per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    limit: u32,
    window: Duration,
}

impl RateLimitPolicy {
    /// Both values must be positive.
    pub fn new(limit: u32, window: Duration) -> Result<Self, CoreError> {
        if limit == 0 {
            return Err(CoreError::Validation(
                "rate limit must allow at least one dispatch per window".to_string(),
            ));
        }
        if window <= Duration::zero() {
            return Err(CoreError::Validation(
                "rate window must be longer than zero".to_string(),
            ));
        }
        Ok(Self { limit, window })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Next catalog index: `(last_index + 1) mod catalog_size`.
///
/// Panics if `catalog_size` is zero; a [`Catalog`](crate::catalog::Catalog)
/// is never empty.
pub fn select_next(state: &DispatchState, catalog_size: usize) -> usize {
    assert!(catalog_size > 0, "catalog size must be positive");
    (state.last_index % catalog_size + 1) % catalog_size
}

/// Outcome of [`check_rate_limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// A dispatch may run. When `window_expired` is set, recording it will
    /// open a fresh window.
    Allowed { window_expired: bool },
    /// The window is full until `retry_after` has elapsed.
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

fn window_expired(state: &DispatchState, now: Timestamp, policy: &RateLimitPolicy) -> bool {
    now - state.window_start >= policy.window
}

/// Fixed-window check.
///
/// An expired window always passes; otherwise the check passes while
/// `window_count < limit`.
pub fn check_rate_limit(
    state: &DispatchState,
    now: Timestamp,
    policy: &RateLimitPolicy,
) -> RateDecision {
    if window_expired(state, now, policy) {
        return RateDecision::Allowed {
            window_expired: true,
        };
    }
    if state.window_count < policy.limit {
        return RateDecision::Allowed {
            window_expired: false,
        };
    }
    RateDecision::Limited {
        retry_after: (state.window_start + policy.window) - now,
    }
}

/// State after a successful dispatch of `index` at `now`.
pub fn record_dispatch(
    state: &DispatchState,
    index: usize,
    now: Timestamp,
    policy: &RateLimitPolicy,
) -> DispatchState {
    let (window_count, window_start) = if window_expired(state, now, policy) {
        (1, now)
    } else {
        (state.window_count.saturating_add(1), state.window_start)
    };

    DispatchState {
        last_index: index,
        last_dispatch_at: Some(now),
        window_count,
        window_start,
    }
}

// ---------------------------------------------------------------------------
// Budget reporting
// ---------------------------------------------------------------------------

/// Rate budget as seen at a given instant, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateBudget {
    pub limit: u32,
    /// Dispatches counted against the live window (0 once it expired).
    pub used: u32,
    pub remaining: u32,
    /// End of the live window, `None` once it expired.
    pub window_resets_at: Option<Timestamp>,
    /// Earliest instant a dispatch would pass the rate check.
    pub next_slot_at: Timestamp,
}

pub fn remaining_budget(
    state: &DispatchState,
    now: Timestamp,
    policy: &RateLimitPolicy,
) -> RateBudget {
    if window_expired(state, now, policy) {
        return RateBudget {
            limit: policy.limit,
            used: 0,
            remaining: policy.limit,
            window_resets_at: None,
            next_slot_at: now,
        };
    }

    let resets_at = state.window_start + policy.window;
    let remaining = policy.limit.saturating_sub(state.window_count);
    RateBudget {
        limit: policy.limit,
        used: state.window_count,
        remaining,
        window_resets_at: Some(resets_at),
        next_slot_at: if remaining > 0 { now } else { resets_at },
    }
}
