//! CLI entry point for vitals-relay.
//!
//! # Usage
//!
//! Start the relay:
//! ```bash
//! vitals-relay serve --config config/relay.toml
//! ```

// Global allocator for improved allocation performance under concurrent
// ingestion load.
#[cfg(not(test))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::signal;

use vitals_relay::api::{self, AppState};
use vitals_relay::config::RelayConfig;
use vitals_relay::ledger::RecordLedger;
use vitals_relay::logging;
use vitals_relay::store::DeviceStateStore;

#[derive(Parser)]
#[command(name = "vitals-relay")]
#[command(about = "Telemetry relay for remote medical sensing devices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Configuration file (TOML)
        #[arg(long, default_value = "config/relay.toml")]
        config: PathBuf,

        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port } => serve(config, port).await,
    }
}

async fn serve(config_path: PathBuf, port: Option<u16>) -> Result<()> {
    let mut config = RelayConfig::load_from(&config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate().map_err(|msg| anyhow::anyhow!(msg))?;
    logging::init_from_config(&config).map_err(|msg| anyhow::anyhow!(msg))?;

    let addr = config.server.socket_addr()?;
    tracing::info!(
        app = %config.application.name,
        data_dir = %config.storage.data_dir.display(),
        "starting relay"
    );

    let state = AppState {
        store: Arc::new(DeviceStateStore::new()),
        ledger: Arc::new(RecordLedger::open(&config.storage)?),
        auth: Arc::new(config.auth.clone()),
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("relay shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
    }
}
