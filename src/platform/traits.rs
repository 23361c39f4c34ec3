//! Platform traits and error types
//!
//! This module defines the trait interface for the content platform and the
//! closed set of failures every platform call is mapped into.

use crate::config::LoginConfig;
use crate::platform::{PostHandle, Submission};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during platform operations
///
/// Every provider failure is mapped into one of these kinds. Anything that
/// fits no other kind lands in `Unclassified` rather than being swallowed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{resource} redirected to {location}")]
    Redirected { resource: String, location: String },

    #[error("Duplicate content: {0}")]
    DuplicateContent(String),

    #[error("API error {code}: {message}")]
    Api {
        status: Option<u16>,
        code: String,
        message: String,
    },

    #[error("Unclassified error: {0}")]
    Unclassified(String),
}

impl PlatformError {
    /// Returns true if the failure is expected to clear after a delay
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Network(_) | Self::Server { .. }
        )
    }

    /// Returns true if the failure means a source subreddit can never be read
    ///
    /// Private subreddits answer 403, banned ones 404, and names that do not
    /// resolve redirect to the search page.
    pub fn is_invalid_source(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Forbidden(_) | Self::Redirected { .. }
        )
    }

    /// Classifies a transport-level failure from the HTTP client
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            Self::Network(format!("Connection failed: {}", err))
        } else if err.is_request() || err.is_body() {
            Self::Network(err.to_string())
        } else if err.is_decode() {
            Self::Unclassified(format!("Malformed response: {}", err))
        } else {
            Self::Unclassified(err.to_string())
        }
    }
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Trait for content platform implementations
///
/// This trait covers every remote operation the mirror loop needs. Session
/// handling, HTTP execution and rate-limit headers are the implementation's
/// concern.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Logs in with the bot account
    ///
    /// # Errors
    ///
    /// * `InvalidCredentials` - The account or app credentials were rejected
    /// * `RateLimited` / `Network` / `Server` - Transient, may be retried
    async fn authenticate(&mut self, credentials: &LoginConfig) -> PlatformResult<()>;

    /// Fetches the newest submissions of a single community
    ///
    /// Used as a lightweight probe to check that a source subreddit exists
    /// and is readable.
    async fn fetch_recent(&self, community: &str, limit: u32) -> PlatformResult<Vec<Submission>>;

    /// Fetches the hottest submissions of an aggregate feed (`a+b+c`)
    async fn fetch_aggregate_hot(&self, feed: &str, limit: u32) -> PlatformResult<Vec<Submission>>;

    /// Submits a link post to `community`
    async fn submit_link(&self, community: &str, title: &str, url: &str)
        -> PlatformResult<PostHandle>;

    /// Submits a self-text post to `community`
    async fn submit_text(
        &self,
        community: &str,
        title: &str,
        body: &str,
    ) -> PlatformResult<PostHandle>;
}
