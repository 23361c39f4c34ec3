//! Platform module for talking to the content platform
//!
//! This module contains everything that crosses the network boundary:
//! - The `Platform` trait the mirror loop is written against
//! - A closed error taxonomy for provider failures
//! - The Reddit OAuth client implementation

mod reddit;
mod traits;

#[cfg(test)]
pub(crate) mod mock;

pub use reddit::RedditClient;
pub use traits::{Platform, PlatformError, PlatformResult};

use chrono::{DateTime, Utc};

/// A remote post as seen in a listing
///
/// Fields that removed or deleted posts may lack are optional; the content
/// extractor decides whether the submission is usable.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub subreddit: String,
    pub title: Option<String>,
    /// Absolute link to the submission's comment page
    pub permalink: Option<String>,
    pub is_self: bool,
    pub selftext: Option<String>,
    pub url: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

/// A post created in the destination subreddit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHandle {
    pub id: String,
    pub url: String,
}
