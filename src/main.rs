//! Matchmaker Relay
//!
//! WebSocket relay that pairs two clients through a shared room code. One client creates
//! a room, a second joins it, and both are told about each other.

mod config;
mod room;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::RelayConfig;
use server::{ServerConfig, WebSocketServer};

/// Matchmaker Relay
///
/// WebSocket matchmaking relay for two-player rooms
#[derive(Parser, Debug)]
#[command(name = "matchmaker-relay")]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on [default: 8080]
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Bind address [default: 0.0.0.0]
    #[arg(long)]
    bind: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Matchmaker Relay v{}", env!("CARGO_PKG_VERSION"));

    let relay_config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            RelayConfig::load(path)?
        }
        None => RelayConfig::default(),
    }
    .with_overrides(args.bind, args.port);

    // Create server configuration
    let config = ServerConfig::new(relay_config.bind, relay_config.port);

    // Create and start the WebSocket server
    let server = Arc::new(WebSocketServer::new(config));
    let server_handle = Arc::clone(&server);

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Initiating graceful shutdown...");
        server_handle.shutdown();
    });

    // Run the server
    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
