use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;

/// Main configuration structure for mirrorbot
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub main: MainConfig,
    pub logging: LoggingConfig,
    pub login: LoginConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// What to mirror and where
#[derive(Debug, Clone, Deserialize)]
pub struct MainConfig {
    /// Enables the human-readable progress stream at debug level
    #[serde(default)]
    pub verbose: bool,

    /// Source subreddits to mirror from
    #[serde(deserialize_with = "deserialize_subreddits")]
    pub subreddits: Vec<String>,

    /// Destination subreddit
    #[serde(rename = "post-to", deserialize_with = "deserialize_community")]
    pub post_to: String,

    /// Scan no more than this number of submissions per poll
    #[serde(rename = "scrape-limit")]
    pub scrape_limit: u32,
}

/// Persistent error log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(rename = "error-logging")]
    pub error_logging: bool,

    #[serde(rename = "error-log-path", default = "default_error_log_path")]
    pub error_log_path: String,
}

/// Bot account credentials
#[derive(Clone, Deserialize)]
pub struct LoginConfig {
    pub username: String,
    pub password: String,
    #[serde(rename = "client-id")]
    pub client_id: String,
    #[serde(rename = "client-secret")]
    pub client_secret: String,
}

impl fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Endpoint and HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Base URL for the token endpoint
    #[serde(rename = "auth-url")]
    pub auth_url: String,

    /// Base URL for authenticated API calls
    #[serde(rename = "api-url")]
    pub api_url: String,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            user_agent: "xposting bot (mirrorbot)".to_string(),
            auth_url: "https://www.reddit.com".to_string(),
            api_url: "https://oauth.reddit.com".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Hostname rewriting applied to permalinks, bodies and link URLs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    #[serde(rename = "tracking-host")]
    pub tracking_host: String,

    #[serde(rename = "canonical-host")]
    pub canonical_host: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            tracking_host: "www.reddit.com".to_string(),
            canonical_host: "np.reddit.com".to_string(),
        }
    }
}

/// Retry budgets and fixed backoff intervals
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Wait after a rate-limit or network error (seconds)
    #[serde(rename = "backoff-secs")]
    pub backoff_secs: u64,

    /// Wait after skipping an already-processed submission (seconds)
    #[serde(rename = "skip-delay-secs")]
    pub skip_delay_secs: u64,

    #[serde(rename = "login-attempts")]
    pub login_attempts: u32,

    #[serde(rename = "validation-passes")]
    pub validation_passes: u32,

    #[serde(rename = "submit-attempts")]
    pub submit_attempts: u32,

    /// Give up on a submission after it has been abandoned this many cycles.
    /// Unset means abandoned submissions are retried on every poll.
    #[serde(rename = "max-deferrals")]
    pub max_deferrals: Option<u32>,
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn skip_delay(&self) -> Duration {
        Duration::from_secs(self.skip_delay_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_secs: 60,
            skip_delay_secs: 2,
            login_attempts: 3,
            validation_passes: 3,
            submit_attempts: 3,
            max_deferrals: None,
        }
    }
}

/// Bounds for the processed-submission tracker
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Size at which a trim is triggered
    #[serde(rename = "high-water")]
    pub high_water: usize,

    /// Size the tracker is trimmed down to
    #[serde(rename = "low-water")]
    pub low_water: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            high_water: 1000,
            low_water: 900,
        }
    }
}

fn default_error_log_path() -> String {
    "mirrorbot_logerr.log".to_string()
}

/// Strips whitespace and an optional `r/` or `/r/` prefix
pub(crate) fn clean_community(name: &str) -> String {
    let trimmed = name.trim();
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
    trimmed
        .strip_prefix("r/")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

fn deserialize_community<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(clean_community(&raw))
}

/// Accepts either a TOML array or a single comma-separated string
fn deserialize_subreddits<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    let names = match Raw::deserialize(deserializer)? {
        Raw::List(list) => list,
        Raw::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };

    Ok(names
        .iter()
        .map(|n| clean_community(n))
        .filter(|n| !n.is_empty())
        .collect())
}
