//! linekv - A Minimal Networked Key-Value Cache
//!
//! This is the main entry point for the linekv server.
//! It parses arguments, sets up logging, starts the hub and stops it on Ctrl+C.

use clap::Parser;
use linekv::{AcceptErrorPolicy, Config, DrainMode, Hub, KeyValueStore, MissingKeyPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// linekv server
#[derive(Parser, Debug)]
#[command(name = "linekv")]
#[command(about = "A minimal networked in-memory key-value cache")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = linekv::DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = linekv::DEFAULT_PORT)]
    port: u16,

    /// Snapshot file location
    #[arg(short, long, default_value = linekv::config::DEFAULT_SNAPSHOT_PATH)]
    snapshot: PathBuf,

    /// Seconds to wait between the shutdown warning and the forced close
    #[arg(short, long, default_value_t = 10)]
    grace_period_secs: u64,

    /// Finish draining as soon as every client has disconnected
    #[arg(long)]
    drain_early: bool,

    /// Keep the session open after a `get` on a missing key
    #[arg(long)]
    keep_open_on_missing: bool,

    /// Log accept errors and keep running instead of exiting
    #[arg(long)]
    continue_on_accept_error: bool,

    /// Terminate every reply with a newline
    #[arg(long)]
    newline: bool,
}

impl Args {
    fn into_config(self) -> Config {
        Config::builder()
            .host(self.host)
            .port(self.port)
            .snapshot_path(self.snapshot)
            .grace_period(Duration::from_secs(self.grace_period_secs))
            .drain_mode(if self.drain_early {
                DrainMode::EarlyExit
            } else {
                DrainMode::FullGracePeriod
            })
            .missing_key_policy(if self.keep_open_on_missing {
                MissingKeyPolicy::KeepOpen
            } else {
                MissingKeyPolicy::CloseConnection
            })
            .accept_error_policy(if self.continue_on_accept_error {
                AcceptErrorPolicy::LogAndContinue
            } else {
                AcceptErrorPolicy::Abort
            })
            .reply_terminator(self.newline.then(|| "\n".to_string()))
            .build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let config = Args::parse().into_config();
    info!(version = linekv::VERSION, "linekv starting");

    // Create the store (shared across all connections)
    let store = Arc::new(KeyValueStore::new(config.snapshot_path.clone()));
    info!(snapshot = %store.snapshot_path().display(), "store initialized");

    // A bind failure ends the process here
    let hub = Hub::start(&config, store).await?;
    info!(addr = %hub.local_addr(), "Ready to accept connections. Use Ctrl+C to shut down.");

    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => error!(error = %e, "failed to listen for Ctrl+C, stopping server"),
        },
        _ = hub.failed() => error!("accept loop failed, exiting"),
    }

    hub.stop().await?;
    Ok(())
}
