//! Mirror coordinator - main mirroring loop
//!
//! This module contains the loop that ties the pipeline together:
//! - Logging in with bounded retry
//! - Validating the source subreddits once
//! - Building the aggregate feed
//! - Polling the feed forever and mirroring every new submission

use crate::config::Config;
use crate::content::{extract, LinkNormalizer};
use crate::mirror::submitter::{SubmitFailure, Submitter};
use crate::mirror::validator::validate_sources;
use crate::platform::{Platform, RedditClient, Submission};
use crate::state::{ProcessedSet, SourceList};
use crate::MirrorError;

/// Tally of what happened to one poll batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Submissions returned by the poll
    pub fetched: usize,
    /// Ids evicted from the processed set before the batch
    pub evicted: usize,
    /// Already processed, skipped with a short delay
    pub skipped: usize,
    /// Newly mirrored to the destination
    pub submitted: usize,
    /// Rejected as already present at the destination; marked processed
    pub duplicates: usize,
    /// Content could not be extracted; left for a later poll
    pub extraction_failures: usize,
    /// Submission abandoned this cycle; left for a later poll
    pub deferred: usize,
    /// Deferred too many times and marked processed
    pub force_skipped: usize,
}

/// Main mirror coordinator structure
///
/// Owns every piece of mutable state in the process; nothing is shared.
pub struct Coordinator<P: Platform> {
    config: Config,
    platform: P,
    sources: SourceList,
    processed: ProcessedSet,
    submitter: Submitter,
    normalizer: LinkNormalizer,
}

impl<P: Platform> Coordinator<P> {
    /// Creates a new coordinator around an unauthenticated platform client
    pub fn new(config: Config, platform: P) -> Self {
        Self {
            sources: SourceList::new(config.main.subreddits.iter().cloned()),
            processed: ProcessedSet::from_config(&config.tracker),
            submitter: Submitter::from_config(&config),
            normalizer: LinkNormalizer::from_config(&config.links),
            config,
            platform,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn sources(&self) -> &SourceList {
        &self.sources
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    pub fn processed_mut(&mut self) -> &mut ProcessedSet {
        &mut self.processed
    }

    /// Runs the mirror forever
    ///
    /// Returns only on a fatal startup error: bad credentials, login or
    /// validation retries exhausted, or no usable source left.
    pub async fn run(&mut self) -> Result<(), MirrorError> {
        self.login().await?;
        self.validate_sources().await?;

        tracing::info!("Building multireddit.");
        let feed = self.sources.feed_expression();
        tracing::info!("Multireddit built: /r/{}", feed);

        loop {
            self.run_cycle(&feed).await;
        }
    }

    /// Logs in, backing off between transient failures
    ///
    /// Rejected credentials fail immediately; anything else that is not
    /// transient is treated the same way.
    pub async fn login(&mut self) -> Result<(), MirrorError> {
        let attempts = self.config.retry.login_attempts;
        tracing::info!("Logging in as {}...", self.config.login.username);

        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.platform.authenticate(&self.config.login).await {
                Ok(()) => {
                    tracing::info!("Login was successful.");
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::error!("Failed to login (attempt {}/{}): {}", attempt, attempts, e);
                    if attempt >= attempts {
                        return Err(MirrorError::LoginExhausted { attempts, last: e });
                    }
                    tracing::info!("Waiting to try again...");
                    tokio::time::sleep(self.config.retry.backoff()).await;
                }
                Err(e) => {
                    tracing::error!("Failed to login. {}", e);
                    return Err(MirrorError::Auth(e));
                }
            }
        }
    }

    /// Prunes the source list; fails if nothing usable remains
    pub async fn validate_sources(&mut self) -> Result<(), MirrorError> {
        validate_sources(&self.platform, &mut self.sources, &self.config.retry).await?;

        if self.sources.is_empty() {
            tracing::error!("None of the listed subreddits can be mirrored.");
            return Err(MirrorError::NoSources);
        }

        tracing::info!(
            "Mirroring {} subreddits into /r/{}",
            self.sources.len(),
            self.submitter.destination()
        );
        Ok(())
    }

    /// Polls the feed once and processes the batch
    pub async fn run_cycle(&mut self, feed: &str) -> CycleReport {
        let batch = self.poll(feed).await;
        let report = self.process_batch(&batch).await;

        tracing::info!(
            "Cycle done: {} fetched, {} mirrored, {} duplicates, {} skipped, {} deferred",
            report.fetched,
            report.submitted,
            report.duplicates,
            report.skipped,
            report.deferred
        );
        report
    }

    /// Fetches the hot listing of `feed`, retrying every failure forever
    pub async fn poll(&self, feed: &str) -> Vec<Submission> {
        let limit = self.config.main.scrape_limit;

        loop {
            tracing::info!("Scanning for submissions...");

            match self.platform.fetch_aggregate_hot(feed, limit).await {
                Ok(batch) => return batch,
                Err(e) => {
                    tracing::error!("Failed to fetch /r/{}: {}", feed, e);
                    tracing::info!("Waiting to try again...");
                    tokio::time::sleep(self.config.retry.backoff()).await;
                }
            }
        }
    }

    /// Mirrors every submission in `batch`, in order
    ///
    /// The processed set is trimmed before any id is checked. A failure on one
    /// submission never stops the rest of the batch.
    pub async fn process_batch(&mut self, batch: &[Submission]) -> CycleReport {
        let mut report = CycleReport {
            fetched: batch.len(),
            ..CycleReport::default()
        };

        report.evicted = self.processed.trim();
        if report.evicted > 0 {
            tracing::info!(
                "Trimmed {} ids from the list of finished submissions",
                report.evicted
            );
        }

        for (i, submission) in batch.iter().enumerate() {
            tracing::debug!(
                "Scanning thread ({} / {})...",
                i + 1,
                self.config.main.scrape_limit
            );
            self.process_submission(submission, &mut report).await;
        }

        report
    }

    async fn process_submission(&mut self, submission: &Submission, report: &mut CycleReport) {
        if self.processed.contains(&submission.id) {
            report.skipped += 1;
            tokio::time::sleep(self.config.retry.skip_delay()).await;
            return;
        }

        tracing::debug!(
            "Getting content from submission {} in /r/{}...",
            submission.id,
            submission.subreddit
        );
        if let Some(created) = submission.created {
            tracing::debug!("Submission {} was posted {}", submission.id, created.to_rfc3339());
        }

        let post = match extract(submission, &self.normalizer) {
            Ok(post) => post,
            Err(e) => {
                tracing::error!("{}. Skipping...", e);
                report.extraction_failures += 1;
                return;
            }
        };
        tracing::debug!("Mirroring {}", post.permalink);

        match self.submitter.submit(&self.platform, &post).await {
            Ok(handle) => {
                self.processed.add(&submission.id);
                report.submitted += 1;
                tracing::info!(
                    "Mirrored {} from /r/{} as {}",
                    submission.id,
                    submission.subreddit,
                    handle.url
                );
            }
            Err(failure) if failure.is_terminal() => {
                self.processed.add(&submission.id);
                report.duplicates += 1;
                tracing::info!("{} already exists at the destination", submission.id);
            }
            Err(failure) => self.defer(submission, failure, report),
        }
    }

    /// Leaves an abandoned submission for a later poll, unless it has used up its deferrals
    fn defer(&mut self, submission: &Submission, failure: SubmitFailure, report: &mut CycleReport) {
        report.deferred += 1;
        let count = self.processed.defer(&submission.id);
        tracing::error!(
            "Couldn't mirror {} (abandoned {} time(s)): {}",
            submission.id,
            count,
            failure
        );

        if let Some(max) = self.config.retry.max_deferrals {
            if count >= max {
                self.processed.add(&submission.id);
                report.force_skipped += 1;
                tracing::warn!(
                    "Giving up on {} after {} abandoned cycles",
                    submission.id,
                    count
                );
            }
        }
    }
}

/// Runs the mirror against the Reddit API
///
/// # Example
///
/// ```no_run
/// use mirrorbot::config::load_config;
/// use mirrorbot::mirror::run_mirror;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("settings.toml"))?;
/// run_mirror(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_mirror(config: Config) -> Result<(), MirrorError> {
    let client = RedditClient::new(&config.platform)?;
    let mut coordinator = Coordinator::new(config, client);
    coordinator.run().await
}
