//! Source subreddit validation
//!
//! Probes every configured source once at startup and removes the ones that
//! can never be read. A transient failure aborts the whole pass and restarts
//! it from the top, because rate limits apply to the session rather than to
//! one subreddit.

use crate::config::RetryConfig;
use crate::platform::{Platform, PlatformError};
use crate::state::SourceList;
use crate::MirrorError;
use std::time::Duration;

/// How a single validation pass ended
#[derive(Debug)]
enum PassOutcome {
    /// Every remaining source was probed
    Complete,
    /// Aborted on a transient error; wait before the next pass
    Transient(PlatformError),
    /// Aborted on an unexpected error; restart right away
    Interrupted(PlatformError),
}

/// Removes invalid, private and banned subreddits from `sources`
///
/// # Probe Outcomes
///
/// | Outcome | Action |
/// |---------|--------|
/// | Listing returned | Keep |
/// | Redirect (name does not resolve) | Remove, continue |
/// | HTTP 403 (private) | Remove, continue |
/// | HTTP 404 (banned) | Remove, continue |
/// | Timeout / rate limit / 5xx | Back off, restart the pass |
/// | Any other error | Restart the pass |
///
/// Removals survive a restart. After `retry.validation_passes` aborted passes
/// the sources cannot be trusted and validation fails.
pub async fn validate_sources<P>(
    platform: &P,
    sources: &mut SourceList,
    retry: &RetryConfig,
) -> Result<(), MirrorError>
where
    P: Platform + ?Sized,
{
    let passes = retry.validation_passes;

    for pass in 1..=passes {
        match run_pass(platform, sources).await {
            PassOutcome::Complete => {
                tracing::info!("Subreddit verification completed.");
                return Ok(());
            }
            PassOutcome::Transient(e) => {
                tracing::debug!("Verification pass {}/{} aborted: {}", pass, passes, e);
                if pass < passes {
                    wait(retry.backoff()).await;
                }
            }
            PassOutcome::Interrupted(e) => {
                tracing::debug!("Verification pass {}/{} interrupted: {}", pass, passes, e);
            }
        }
    }

    tracing::error!("Couldn't verify the validity of the listed subreddits. Quitting...");
    Err(MirrorError::ValidationExhausted { passes })
}

async fn run_pass<P>(platform: &P, sources: &mut SourceList) -> PassOutcome
where
    P: Platform + ?Sized,
{
    for name in sources.names() {
        tracing::info!("Verifying /r/{}...", name);

        let error = match platform.fetch_recent(&name, 1).await {
            Ok(_) => continue,
            Err(e) => e,
        };

        if error.is_transient() {
            tracing::error!("/r/{} {}", name, error);
            return PassOutcome::Transient(error);
        }

        if !error.is_invalid_source() {
            tracing::error!("/r/{} {}", name, error);
            return PassOutcome::Interrupted(error);
        }

        let verdict = match error {
            PlatformError::Redirected { .. } => "Invalid subreddit. Removing from list.",
            PlatformError::Forbidden(_) => "Subreddit is private. Removing from list...",
            _ => "Subreddit probably banned. Removing from list...",
        };

        tracing::error!("/r/{}: {} ({})", name, verdict, error);
        sources.remove(&name);
    }

    PassOutcome::Complete
}

async fn wait(backoff: Duration) {
    tracing::debug!("Waiting {:?} to try again...", backoff);
    tokio::time::sleep(backoff).await;
}
