//! Relay CLI - forwards a social account's posts and stories to chat webhooks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use relay::config::Config;
use relay::forwarder::{Forwarder, ForwarderConfig};
use relay::source::{ApiSource, Session};
use relay::store::Storage;
use webhook::{RotatingDelivery, TargetRotation};

/// Forward an account's posts and stories to chat webhooks.
#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Forward an account's posts and stories to chat webhooks")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the account forever, forwarding new content each cycle
    Run {
        /// Account to monitor
        #[arg(long)]
        account: String,

        /// Directory for dedup logs, rotation state and story downloads
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Run a single forwarding cycle (for cron/scheduled use)
    Once {
        /// Account to monitor
        #[arg(long)]
        account: String,

        /// Directory for dedup logs, rotation state and story downloads
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("relay=debug,webhook=debug,info")
    } else {
        EnvFilter::new("relay=info,webhook=info,warn")
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { account, data_dir } => {
            let forwarder = build_forwarder(&account, &data_dir).await?;

            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Shutdown requested");
                    signal_cancel.cancel();
                }
            });

            forwarder.run(cancel).await
        }
        Commands::Once { account, data_dir } => {
            let forwarder = build_forwarder(&account, &data_dir).await?;
            let report = forwarder.cycle().await?;
            tracing::info!(
                posts = report.posts_forwarded,
                stories = report.stories_forwarded,
                failed = report.posts_failed + report.stories_failed,
                "Cycle complete"
            );
            Ok(())
        }
    }
}

/// Wire configuration, session, storage and delivery into a forwarder.
///
/// Anything that fails here is fatal; the loop never starts without a valid
/// configuration and an authenticated session.
async fn build_forwarder(account: &str, data_dir: &Path) -> Result<Forwarder> {
    let config = Config::from_env()?;

    let session_path = data_dir.join("session.json");
    let session = match Session::load(&session_path) {
        Ok(session) => {
            tracing::info!("Session loaded");
            session
        }
        Err(e) => {
            tracing::info!(reason = %e, "No stored session, logging in");
            let session = ApiSource::login(
                &config.source_api_url,
                &config.source_username,
                &config.source_password,
            )
            .await
            .context("authentication against the content source failed")?;
            session.save(&session_path)?;
            session
        }
    };

    let source = ApiSource::new(&config.source_api_url, &session)?;
    let rotation = TargetRotation::new(config.webhook_urls.clone(), data_dir.join("targets.json"))?;
    let delivery = RotatingDelivery::new(rotation);
    let storage = Storage::new(data_dir);

    Ok(Forwarder::new(
        Arc::new(source),
        Arc::new(delivery),
        storage,
        ForwarderConfig::new(account, &config.source_web_url),
    ))
}
