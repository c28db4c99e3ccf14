//! Bounded timeout plus a single backoff retry for outbound calls.

use std::future::Future;
use std::time::Duration;

use chaincast_core::ports::{GenerationError, PublishError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Pause before the retry.
    pub backoff: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Longest one guarded call can take: every attempt timing out, plus the
    /// pauses between them.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        self.timeout * attempts + self.backoff * (attempts - 1)
    }

    /// Same timeout, no retry.
    pub fn single_attempt(&self) -> Self {
        Self {
            max_attempts: 1,
            ..*self
        }
    }
}

/// Errors that know whether another attempt may help.
pub trait RetryableError: std::fmt::Display {
    fn is_transient(&self) -> bool;
    fn timed_out(after: Duration) -> Self;
}

impl RetryableError for GenerationError {
    fn is_transient(&self) -> bool {
        GenerationError::is_transient(self)
    }

    fn timed_out(after: Duration) -> Self {
        GenerationError::TimedOut(after)
    }
}

impl RetryableError for PublishError {
    fn is_transient(&self) -> bool {
        PublishError::is_transient(self)
    }

    fn timed_out(after: Duration) -> Self {
        PublishError::TimedOut(after)
    }
}

/// Run `call` under the policy's timeout, retrying transient failures.
pub async fn call_with_retry<T, E, F, Fut>(
    operation: &'static str,
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T, E>
where
    E: RetryableError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(E::timed_out(policy.timeout)),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && e.is_transient() => {
                tracing::warn!(
                    operation,
                    attempt,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use assert_matches::assert_matches;

    const POLICY: RetryPolicy = RetryPolicy {
        timeout: Duration::from_millis(200),
        backoff: Duration::from_millis(1),
        max_attempts: 2,
    };

    #[test]
    fn worst_case_counts_every_attempt_and_pause() {
        assert_eq!(POLICY.worst_case(), Duration::from_millis(401));
        assert_eq!(POLICY.single_attempt().worst_case(), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, GenerationError> = call_with_retry("test", &POLICY, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(GenerationError::Transport {
                    message: "reset".into(),
                })
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), PublishError> = call_with_retry("test", &POLICY, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PublishError::RateLimited {
                retry_after_secs: None,
            })
        })
        .await;
        assert_matches!(result, Err(PublishError::RateLimited { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), GenerationError> = call_with_retry("test", &POLICY, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(GenerationError::Api {
                status: 503,
                body: "busy".into(),
            })
        })
        .await;
        assert_matches!(result, Err(GenerationError::Api { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..POLICY
        };
        let result: Result<(), GenerationError> = call_with_retry("test", &policy, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_matches!(result, Err(GenerationError::TimedOut(_)));
    }
}
