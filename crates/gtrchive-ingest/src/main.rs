//! gtrchive ingestion daemon.
//!
//! Subscribes to the provider's filtered stream for the configured track
//! terms and writes every tweet it receives to ClickHouse. Runs until the
//! stream ends for good or the process is terminated.
//!
//! # Usage
//!
//! ```bash
//! # Configuration comes from GTR_* environment variables
//! GTR_TWITTER_TRACK=rust,tokio gtrchive-ingest
//!
//! # Load variables from a file first
//! gtrchive-ingest --dotenv /etc/gtrchive/env
//!
//! # Disable the Prometheus endpoint
//! gtrchive-ingest --metrics-port 0
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use gtrchive_core::metrics::{init_metrics, start_metrics_server};
use gtrchive_ingest::{Archiver, ArchiverConfig, ClickHouseStore, Config, TwitterClient};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// gtrchive ingestion daemon.
#[derive(Parser, Debug)]
#[command(name = "gtrchive-ingest")]
#[command(about = "Archive a filtered tweet stream into ClickHouse")]
#[command(version)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,

    /// Metrics HTTP server port (0 to disable)
    #[arg(long, env = "GTR_METRICS_PORT", default_value = "9090")]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load .env file if it exists
    if std::path::Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)
            .with_context(|| format!("Failed to load {}", args.dotenv))?;
        eprintln!("Loaded environment from {}", args.dotenv);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gtrchive_ingest=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Install rustls crypto provider (an Err only means one is already installed)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    tracing::info!(
        "gtrchive ingestion daemon {} starting ({}/{})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    let config = Config::from_env().context("Invalid configuration")?;

    if args.metrics_port > 0 {
        let handle = init_metrics().context("Failed to install metrics recorder")?;
        start_metrics_server(args.metrics_port, handle)
            .await
            .context("Failed to start metrics server")?;
    }

    tracing::info!("Configuration:");
    tracing::info!("  Store: {}", config.store.url());
    tracing::info!("  Database: {}", config.store.database);
    tracing::info!("  Table: {}", config.table);
    tracing::info!("  Track: {:?}", config.track);
    tracing::info!("  TLS: {}", config.store.tls.is_configured());

    let store = ClickHouseStore::connect(&config.store)
        .await
        .with_context(|| format!("Unable to connect to ClickHouse at {}", config.store.url()))?;

    let provider =
        TwitterClient::new(&config.twitter).context("Failed to build stream client")?;

    let archiver = Archiver::new(
        provider,
        store,
        ArchiverConfig {
            track: config.track,
            table: config.table,
        },
    );

    let stats = archiver.run().await.context("Archiver stopped")?;

    tracing::info!("Ingestion complete:");
    tracing::info!("  Messages received: {}", stats.messages);
    tracing::info!("  Tweets: {}", stats.tweets);
    tracing::info!("  Inserted: {}", stats.inserted);
    tracing::info!("  Insert errors: {}", stats.insert_errors);
    tracing::info!("  Ignored: {}", stats.ignored);

    Ok(())
}
