//! REST client for the Twitter API v2 `tweets` endpoint.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::oauth::{generate_nonce, OAuthCredentials};

pub const DEFAULT_API_BASE: &str = "https://api.twitter.com";

/// Client settings.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    pub credentials: OAuthCredentials,
    /// Base URL without trailing slash, e.g. `https://api.twitter.com`.
    pub api_base: String,
    pub timeout: Duration,
}

impl TwitterConfig {
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

/// Errors from the Twitter REST layer.
#[derive(Debug, thiserror::Error)]
pub enum TwitterError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// HTTP 429. `reset_at` is the epoch second from `x-rate-limit-reset`.
    #[error("Twitter rate limit exceeded")]
    RateLimited { reset_at: Option<i64> },

    /// Twitter returned another non-2xx status code.
    #[error("Twitter API error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct CreateTweet<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplyTo<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplyTo<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

/// HTTP client for one account.
pub struct TwitterClient {
    client: reqwest::Client,
    config: TwitterConfig,
}

impl TwitterClient {
    pub fn new(config: TwitterConfig) -> Result<Self, TwitterError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TwitterConfig {
        &self.config
    }

    /// Post a tweet, optionally as a reply. Returns the new tweet id.
    pub async fn create_tweet(
        &self,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<String, TwitterError> {
        let url = format!("{}/2/tweets", self.config.api_base);
        let authorization = self.config.credentials.authorization_header(
            "POST",
            &url,
            &[],
            &generate_nonce(),
            &Utc::now().timestamp().to_string(),
        );

        let body = CreateTweet {
            text,
            reply: in_reply_to.map(|id| ReplyTo {
                in_reply_to_tweet_id: id,
            }),
        };

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let created: CreateTweetResponse = response.json().await?;
        Ok(created.data.id)
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TwitterError> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let reset_at = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok());
            return Err(TwitterError::RateLimited { reset_at });
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TwitterError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
