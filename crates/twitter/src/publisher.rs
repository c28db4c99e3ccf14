//! [`Publisher`] implementation on top of [`TwitterClient`].

use std::time::Duration;

use async_trait::async_trait;
use chaincast_core::ports::{PublishError, Publisher};
use chrono::Utc;

use crate::api::{TwitterClient, TwitterError};

impl TwitterError {
    /// Map onto the publisher error vocabulary. `now` is used to turn a
    /// rate-limit reset instant into a delay.
    pub fn into_publish_error(self, timeout: Duration, now: i64) -> PublishError {
        match self {
            TwitterError::Request(err) if err.is_timeout() => PublishError::TimedOut(timeout),
            TwitterError::Request(err) => PublishError::Transport {
                message: err.to_string(),
            },
            TwitterError::RateLimited { reset_at } => PublishError::RateLimited {
                retry_after_secs: reset_at.map(|reset| u64::try_from(reset - now).unwrap_or(0)),
            },
            TwitterError::ApiError { status, body } => PublishError::Rejected { status, body },
        }
    }
}

#[async_trait]
impl Publisher for TwitterClient {
    async fn post_segment(
        &self,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<String, PublishError> {
        tracing::debug!(
            in_reply_to,
            chars = text.chars().count(),
            "Posting tweet",
        );
        self.create_tweet(text, in_reply_to)
            .await
            .map_err(|e| e.into_publish_error(self.config().timeout, Utc::now().timestamp()))
    }
}
