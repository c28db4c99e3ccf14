//! Twitter (X) API v2 client used as the bot's publisher.
//!
//! Requests are signed with OAuth 1.0a user-context credentials. Each publish
//! call is one tweet; the dispatcher chains thread replies.

pub mod api;
pub mod oauth;
pub mod publisher;

pub use api::{TwitterClient, TwitterConfig, TwitterError};
pub use oauth::OAuthCredentials;
