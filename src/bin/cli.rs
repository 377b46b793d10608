//! Gazette CLI
//!
//! Local execution entry point for the feed pipeline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gazette::{
    error::Result,
    models::Config,
    pipeline::{self, NewsRunOptions, RunOptions},
    services,
    storage::LocalStateStore,
    utils::http::{self, HttpPageSource},
    webhook::WebhookClient,
};

/// Gazette - Game Event Feed Publisher
#[derive(Parser, Debug)]
#[command(
    name = "gazette",
    version,
    about = "Scrapes game event pages and publishes diffs to webhooks"
)]
struct Cli {
    /// Path to storage directory containing config and state files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline for all configured feeds
    Run {
        /// Run only the feed with this key
        #[arg(long)]
        only: Option<String>,

        /// Create fresh messages instead of editing in place
        #[arg(long)]
        force_new: bool,

        /// Log outbound actions without sending or persisting
        #[arg(long)]
        dry_run: bool,
    },

    /// Poll news sources and publish new posts
    News {
        /// Poll only the sources for this game
        #[arg(long)]
        only: Option<String>,

        /// Log outbound actions without sending or persisting
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show configured feeds and stored state
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Gazette starting...");

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    let store = LocalStateStore::new(&cli.storage_dir);

    match cli.command {
        Command::Run {
            only,
            force_new,
            dry_run,
        } => {
            config.validate()?;

            let options = RunOptions {
                only_key: only,
                force_new,
                dry_run,
            };

            let client = http::create_client(&config.http)?;
            let source = HttpPageSource::new(client);
            let webhook = WebhookClient::new(&config.http, config.retry.clone(), dry_run)?;

            let results =
                pipeline::run_feeds(&config, &source, &store, &webhook, &options).await?;
            pipeline::send_run_summary(&webhook, &config, &results).await?;

            let failed = results
                .iter()
                .filter(|r| r.status == gazette::models::FeedStatus::Failed)
                .count();
            log::info!(
                "Run complete: {} feed(s), {} failed",
                results.len(),
                failed
            );
        }

        Command::News { only, dry_run } => {
            config.validate()?;

            let options = NewsRunOptions {
                only_game: only,
                dry_run,
            };

            let client = http::create_client(&config.http)?;
            let source = HttpPageSource::new(client);
            let webhook = WebhookClient::new(&config.http, config.retry.clone(), dry_run)?;
            let sources = services::build_sources(&config.news);

            let report =
                pipeline::run_news(&config, &sources, &source, &store, &webhook, &options)
                    .await?;
            log::info!(
                "News complete: {} discovered, {} published, {} skipped, {} source(s) failed",
                report.discovered,
                report.published,
                report.skipped,
                report.failed_sources
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} feeds)", config.feeds.len());
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!(
                "Config: {}",
                if config_path.exists() {
                    "config.toml"
                } else {
                    "built-in defaults"
                }
            );

            for feed in &config.feeds {
                log::info!(
                    "Feed '{}': {} (webhook env {}, extractor {})",
                    feed.key,
                    feed.url,
                    feed.webhook_env,
                    feed.extractor
                );
            }

            use gazette::storage::StateStore;
            let states = store.load_states().await?;
            if states.is_empty() {
                log::info!("No stored state yet.");
            } else {
                for (key, state) in &states {
                    log::info!(
                        "State '{}': {} item(s), last updated {}",
                        key,
                        state.items.len(),
                        state.last_updated.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
