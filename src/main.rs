//! mirrorbot main entry point
//!
//! This is the command-line interface for the subreddit mirroring bot.

use clap::Parser;
use mirrorbot::config::{load_config_with_hash, Config};
use mirrorbot::mirror::{run_mirror, Coordinator};
use mirrorbot::RedditClient;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// mirrorbot: mirrors new posts from a set of subreddits into one destination
///
/// The bot polls the hot listing of every source subreddit combined and
/// re-posts each submission it has not seen before, retrying through rate
/// limits and timeouts.
#[derive(Parser, Debug)]
#[command(name = "mirrorbot")]
#[command(version = "1.0.0")]
#[command(about = "Mirrors subreddits into a single destination", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "settings.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and print it without contacting Reddit
    #[arg(long, conflicts_with = "check")]
    dry_run: bool,

    /// Log in, verify the source subreddits, print the survivors and exit
    #[arg(long, conflicts_with = "dry_run")]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logging depends on the config, so load it first
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    setup_logging(&config, cli.verbose, cli.quiet)?;
    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.check {
        handle_check(config).await
    } else {
        handle_mirror(config).await
    }
}

/// Sets up the progress stream and, if enabled, the persistent error log
fn setup_logging(config: &Config, verbose: u8, quiet: bool) -> std::io::Result<()> {
    let level = if quiet {
        "error"
    } else {
        match (config.main.verbose, verbose) {
            (false, 0) => "mirrorbot=info,warn",
            (true, 0) | (false, 1) => "mirrorbot=debug,info",
            _ => "mirrorbot=trace,debug",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(filter);

    let error_layer = if config.logging.error_logging {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.error_log_path)?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_filter(LevelFilter::ERROR),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(error_layer)
        .init();

    Ok(())
}

/// Handles the --dry-run mode: shows what would be mirrored
fn handle_dry_run(config: &Config) {
    println!("=== mirrorbot Dry Run ===\n");

    println!("Mirror:");
    println!("  Destination: /r/{}", config.main.post_to);
    println!("  Scrape limit: {}", config.main.scrape_limit);
    println!("  Verbose: {}", config.main.verbose);

    println!("\nSources ({}):", config.main.subreddits.len());
    for name in &config.main.subreddits {
        println!("  - /r/{}", name);
    }

    println!("\nLogin:");
    println!("  Username: {}", config.login.username);
    println!("  User agent: {}", config.platform.user_agent);

    println!("\nRetry:");
    println!("  Backoff: {}s", config.retry.backoff_secs);
    println!("  Login attempts: {}", config.retry.login_attempts);
    println!("  Validation passes: {}", config.retry.validation_passes);
    println!("  Submit attempts: {}", config.retry.submit_attempts);
    match config.retry.max_deferrals {
        Some(max) => println!("  Max deferrals: {}", max),
        None => println!("  Max deferrals: unlimited"),
    }

    println!("\nLinks: {} -> {}", config.links.tracking_host, config.links.canonical_host);

    if config.logging.error_logging {
        println!("\nError log: {}", config.logging.error_log_path);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --check mode: login and source validation only
async fn handle_check(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = RedditClient::new(&config.platform)?;
    let mut coordinator = Coordinator::new(config, client);

    coordinator.login().await?;
    coordinator.validate_sources().await?;

    println!("Valid sources ({}):", coordinator.sources().len());
    for name in coordinator.sources().iter() {
        println!("  - /r/{}", name);
    }
    println!("Feed: /r/{}", coordinator.sources().feed_expression());

    Ok(())
}

/// Handles the main mirror loop, which only returns on a fatal error
async fn handle_mirror(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Mirroring {} subreddits into /r/{}",
        config.main.subreddits.len(),
        config.main.post_to
    );

    match run_mirror(config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("Mirror stopped: {}", e);
            Err(e.into())
        }
    }
}
