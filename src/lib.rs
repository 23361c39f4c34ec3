//! mirrorbot: a long-running subreddit mirroring agent
//!
//! This crate polls an aggregate feed built from a list of source subreddits and
//! re-posts every new submission into a single destination subreddit, tolerating
//! an unreliable, rate-limited API.

pub mod config;
pub mod content;
pub mod mirror;
pub mod platform;
pub mod state;

use thiserror::Error;

/// Main error type for mirrorbot operations
///
/// Every variant here is fatal: steady-state failures are handled inside the
/// mirror loop and never surface as a `MirrorError`.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {0}")]
    Auth(#[source] platform::PlatformError),

    #[error("Failed to log in after {attempts} attempts: {last}")]
    LoginExhausted {
        attempts: u32,
        last: platform::PlatformError,
    },

    #[error("Couldn't verify the listed subreddits after {passes} passes")]
    ValidationExhausted { passes: u32 },

    #[error("No valid source subreddits remain after validation")]
    NoSources,

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for mirrorbot operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use content::{extract, ExtractionError, LinkNormalizer, MirrorPost};
pub use mirror::{Coordinator, CycleReport};
pub use platform::{Platform, PlatformError, PostHandle, RedditClient, Submission};
pub use state::{ProcessedSet, SourceList};
