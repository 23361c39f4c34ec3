//! Posting to the destination subreddit with bounded retry

use crate::config::Config;
use crate::content::{MirrorPost, PostKind};
use crate::platform::{Platform, PlatformError, PostHandle};
use std::time::Duration;
use thiserror::Error;

/// Why a submission did not produce a new post
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitFailure {
    /// The destination already holds this content
    #[error("Already submitted to the destination: {0}")]
    Duplicate(String),

    /// Every attempt hit a transient error
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: PlatformError },

    /// The platform refused the post for another reason
    #[error("Submission rejected: {0}")]
    Rejected(PlatformError),
}

impl SubmitFailure {
    /// Returns true if the submission should be treated as done
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Posts mirrored content to a single destination subreddit
#[derive(Debug, Clone)]
pub struct Submitter {
    destination: String,
    attempts: u32,
    backoff: Duration,
}

impl Submitter {
    pub fn new(destination: impl Into<String>, attempts: u32, backoff: Duration) -> Self {
        Self {
            destination: destination.into(),
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.main.post_to,
            config.retry.submit_attempts,
            config.retry.backoff(),
        )
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Submits `post`, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Success | Return the new post |
    /// | Duplicate content | Immediate → `Duplicate` |
    /// | Timeout / rate limit / 5xx | Wait the backoff, retry; `Exhausted` once out of attempts |
    /// | Other API error | Immediate → `Rejected` |
    pub async fn submit<P>(&self, platform: &P, post: &MirrorPost) -> Result<PostHandle, SubmitFailure>
    where
        P: Platform + ?Sized,
    {
        let mut last = PlatformError::Unclassified("no submit attempt was made".to_string());

        for attempt in 1..=self.attempts {
            tracing::info!(
                "Submitting {} post to /r/{} (attempt {}/{})...",
                post.kind,
                self.destination,
                attempt,
                self.attempts
            );

            let result = match post.kind {
                PostKind::Text => {
                    platform
                        .submit_text(&self.destination, &post.title, &post.content)
                        .await
                }
                PostKind::Link => {
                    platform
                        .submit_link(&self.destination, &post.title, &post.content)
                        .await
                }
            };

            match result {
                Ok(handle) => return Ok(handle),
                Err(PlatformError::DuplicateContent(message)) => {
                    tracing::error!("{}", message);
                    return Err(SubmitFailure::Duplicate(message));
                }
                Err(e) if e.is_transient() => {
                    tracing::error!(
                        "Submit attempt {}/{} failed: {}",
                        attempt,
                        self.attempts,
                        e
                    );
                    tracing::debug!("Waiting {:?} to try again...", self.backoff);
                    tokio::time::sleep(self.backoff).await;
                    last = e;
                }
                Err(e) => {
                    tracing::error!("Submit failed: {}", e);
                    return Err(SubmitFailure::Rejected(e));
                }
            }
        }

        Err(SubmitFailure::Exhausted {
            attempts: self.attempts,
            last,
        })
    }
}
