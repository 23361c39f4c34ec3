use crate::config::types::{
    Config, LinksConfig, LoginConfig, MainConfig, PlatformConfig, RetryConfig, TrackerConfig,
};
use crate::ConfigError;
use url::Url;

/// Longest subreddit name the platform accepts
const MAX_COMMUNITY_LEN: usize = 21;

/// Largest listing page the platform returns
const MAX_SCRAPE_LIMIT: u32 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_main_config(&config.main)?;
    validate_login_config(&config.login)?;
    validate_platform_config(&config.platform)?;
    validate_links_config(&config.links)?;
    validate_retry_config(&config.retry)?;
    validate_tracker_config(&config.tracker)?;

    if config.logging.error_logging && config.logging.error_log_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "error_log_path cannot be empty when error_logging is enabled".to_string(),
        ));
    }

    Ok(())
}

fn validate_main_config(config: &MainConfig) -> Result<(), ConfigError> {
    if config.subreddits.is_empty() {
        return Err(ConfigError::Validation(
            "subreddits must list at least one subreddit".to_string(),
        ));
    }

    for name in &config.subreddits {
        validate_community_name(name)?;
    }

    validate_community_name(&config.post_to)?;

    if config.subreddits.iter().any(|s| s.eq_ignore_ascii_case(&config.post_to)) {
        return Err(ConfigError::Validation(format!(
            "post_to '{}' cannot also be a source subreddit",
            config.post_to
        )));
    }

    if config.scrape_limit < 1 || config.scrape_limit > MAX_SCRAPE_LIMIT {
        return Err(ConfigError::Validation(format!(
            "scrape_limit must be between 1 and {}, got {}",
            MAX_SCRAPE_LIMIT, config.scrape_limit
        )));
    }

    Ok(())
}

fn validate_login_config(config: &LoginConfig) -> Result<(), ConfigError> {
    let fields = [
        ("username", &config.username),
        ("password", &config.password),
        ("client_id", &config.client_id),
        ("client_secret", &config.client_secret),
    ];

    for (field, value) in fields {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
        }
    }

    Ok(())
}

fn validate_platform_config(config: &PlatformConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    for (field, value) in [("auth_url", &config.auth_url), ("api_url", &config.api_url)] {
        let url = Url::parse(value)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "{} '{}' must use http or https",
                field, value
            )));
        }
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// The hosts must not overlap, otherwise rewriting would not be idempotent
fn validate_links_config(config: &LinksConfig) -> Result<(), ConfigError> {
    validate_host(&config.tracking_host)?;
    validate_host(&config.canonical_host)?;

    let tracking = config.tracking_host.to_ascii_lowercase();
    let canonical = config.canonical_host.to_ascii_lowercase();

    if tracking.contains(&canonical) || canonical.contains(&tracking) {
        return Err(ConfigError::Validation(format!(
            "tracking_host '{}' and canonical_host '{}' must not contain each other",
            config.tracking_host, config.canonical_host
        )));
    }

    // A rewrite followed by adjacent text must not spell a new tracking host
    if ends_where_other_starts(&tracking, &canonical)
        || ends_where_other_starts(&canonical, &tracking)
    {
        return Err(ConfigError::Validation(format!(
            "tracking_host '{}' and canonical_host '{}' must not overlap at their ends",
            config.tracking_host, config.canonical_host
        )));
    }

    Ok(())
}

/// Returns true if a non-empty proper suffix of `a` is a prefix of `b`
fn ends_where_other_starts(a: &str, b: &str) -> bool {
    (1..a.len())
        .filter(|&i| a.is_char_boundary(i))
        .any(|i| b.starts_with(&a[i..]))
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    let budgets = [
        ("login_attempts", config.login_attempts),
        ("validation_passes", config.validation_passes),
        ("submit_attempts", config.submit_attempts),
    ];

    for (field, value) in budgets {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                field, value
            )));
        }
    }

    if config.max_deferrals == Some(0) {
        return Err(ConfigError::Validation(
            "max_deferrals must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_tracker_config(config: &TrackerConfig) -> Result<(), ConfigError> {
    if config.low_water == 0 || config.low_water >= config.high_water {
        return Err(ConfigError::Validation(format!(
            "tracker bounds must satisfy 0 < low_water < high_water, got {} / {}",
            config.low_water, config.high_water
        )));
    }

    Ok(())
}

/// Validates a subreddit name (without the `r/` prefix)
fn validate_community_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "Subreddit name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_COMMUNITY_LEN {
        return Err(ConfigError::Validation(format!(
            "Subreddit '{}' is longer than {} characters",
            name, MAX_COMMUNITY_LEN
        )));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Validation(format!(
            "Subreddit '{}' contains invalid characters",
            name
        )));
    }

    Ok(())
}

/// Validates a bare hostname
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::Validation("Host cannot be empty".to_string()));
    }

    if host.chars().any(|c| c.is_whitespace() || c == '/' || c == ':') {
        return Err(ConfigError::Validation(format!(
            "Host '{}' must be a bare hostname",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.contains("..") {
        return Err(ConfigError::Validation(format!(
            "Host '{}' has misplaced dots",
            host
        )));
    }

    Ok(())
}
