//! Configuration module for mirrorbot
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use mirrorbot::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("settings.toml")).unwrap();
//! println!("Mirroring {} subreddits", config.main.subreddits.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, LinksConfig, LoggingConfig, LoginConfig, MainConfig, PlatformConfig, RetryConfig,
    TrackerConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
