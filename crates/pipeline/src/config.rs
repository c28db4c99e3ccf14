use std::time::Duration;

use chaincast_core::content::MAX_THREAD_SEGMENTS;
use chaincast_core::cursor::RateLimitPolicy;

use crate::retry::RetryPolicy;

/// Posts of the selected unit consulted for the prompt and duplicate guard.
pub const DEFAULT_RECENT_POSTS: i64 = 5;

/// Pause between replies of a thread.
pub const DEFAULT_THREAD_DELAY: Duration = Duration::from_secs(2);

/// Time set aside for state store round trips within one attempt.
pub const STORE_ALLOWANCE: Duration = Duration::from_secs(10);

/// Runtime settings of a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Key of the persisted state record.
    pub bot_id: String,
    pub rate_limit: RateLimitPolicy,
    /// Lease TTL. Must be at least [`min_dispatch_budget`](Self::min_dispatch_budget).
    pub dispatch_budget: chrono::Duration,
    /// Timeout and single retry for generator and publisher calls.
    pub retry: RetryPolicy,
    pub thread_delay: Duration,
    /// Publish the deterministic fallback post when generation fails.
    pub fallback_enabled: bool,
    pub recent_posts: i64,
}

impl DispatcherConfig {
    /// Defaults, with the lease TTL derived from the outbound timings.
    pub fn new(bot_id: impl Into<String>, rate_limit: RateLimitPolicy) -> Self {
        let mut config = Self {
            bot_id: bot_id.into(),
            rate_limit,
            dispatch_budget: chrono::Duration::zero(),
            retry: RetryPolicy {
                timeout: Duration::from_secs(20),
                backoff: Duration::from_millis(1000),
                max_attempts: 2,
            },
            thread_delay: DEFAULT_THREAD_DELAY,
            fallback_enabled: false,
            recent_posts: DEFAULT_RECENT_POSTS,
        };
        config.dispatch_budget = config.min_dispatch_budget();
        config
    }

    /// Longest the publish step can run: the first segment with its retry,
    /// then one delayed attempt per reply.
    pub fn publish_budget(&self) -> Duration {
        let replies = u32::try_from(MAX_THREAD_SEGMENTS.saturating_sub(1)).unwrap_or(u32::MAX);
        self.retry.worst_case() + (self.thread_delay + self.retry.timeout) * replies
    }

    /// Smallest lease TTL covering generation, publishing and the store
    /// round trips of one attempt.
    pub fn min_dispatch_budget(&self) -> chrono::Duration {
        let total = self.retry.worst_case() + self.publish_budget() + STORE_ALLOWANCE;
        chrono::Duration::from_std(total).unwrap_or(chrono::Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_covers_worst_case_attempt() {
        let policy = RateLimitPolicy::new(1, chrono::Duration::hours(1)).unwrap();
        let config = DispatcherConfig::new("bot", policy);

        // Generation 2 x 20s + 1s, first post the same, five replies at 2s + 20s.
        assert_eq!(config.publish_budget(), Duration::from_secs(41 + 5 * 22));
        assert_eq!(config.min_dispatch_budget(), chrono::Duration::seconds(41 + 151 + 10));
        assert_eq!(config.dispatch_budget, config.min_dispatch_budget());
    }
}
