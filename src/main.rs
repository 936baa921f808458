use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tweet_retention::config::Settings;
use tweet_retention::processor::{self, RunOptions};
use tweet_retention::retention::RetentionPolicy;

/// Delete old, low-engagement tweets and keep CSV ledgers of every decision.
#[derive(Debug, Parser)]
#[command(name = "tweet-retention", version, about)]
struct Cli {
    /// Path to the credentials file (JSON, or TOML with a .toml extension)
    #[arg(short = 'c', long, env = "TWITTER_CREDENTIALS", default_value = "twitter.config")]
    config_filepath: PathBuf,

    /// Base name for the ledgers; written as deleted_<name> and saved_<name>
    #[arg(short = 's', long, default_value = "tweets.csv")]
    save_filepath: PathBuf,

    /// Number of days of tweets to keep
    #[arg(short = 'd', long, default_value_t = 365)]
    days_to_keep: u32,

    /// Minimum likes for a tweet to be kept [default: don't filter on likes]
    #[arg(short = 'f', long)]
    fav_min: Option<u64>,

    /// Minimum retweets for a tweet to be kept [default: don't filter on retweets]
    #[arg(short = 'r', long)]
    rt_min: Option<u64>,

    /// Classify and report without deleting anything
    #[arg(
        long,
        action = ArgAction::Set,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    dry_run: bool,

    /// Actually delete tweets (same as --dry-run=false)
    #[arg(long)]
    live: bool,

    /// Log every tweet and decision
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing(cli.verbose)?;

    let settings = Settings::from_env().context("Failed to load settings")?;
    let options = RunOptions {
        credentials_path: cli.config_filepath,
        export_path: cli.save_filepath,
        policy: RetentionPolicy::new(Some(cli.days_to_keep), cli.fav_min, cli.rt_min),
        dry_run: cli.dry_run && !cli.live,
        verbose: cli.verbose,
    };

    if options.dry_run {
        info!("Dry run: no tweets will be deleted");
    } else {
        warn!("Live run: tweets matching the policy will be deleted");
    }

    let summary = processor::run(&options, &settings)
        .await
        .context("Retention run failed")?;

    info!(
        deleted_ledger = %summary.exported.deleted.display(),
        saved_ledger = %summary.exported.saved.display(),
        confirmed_deletions = summary.confirmed_deletions(),
        "Done"
    );

    Ok(())
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_directive = if verbose {
        "info,tweet_retention=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
