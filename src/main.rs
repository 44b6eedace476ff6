//! Mesh control plane (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────┐
//!                   │                  CONTROL PLANE                    │
//!                   │                                                   │
//!  Proxy register   │  ┌────────┐    ┌────────────────┐                 │
//!  ─────────────────┼─▶│  http  │───▶│ ControlService │──▶ registry     │
//!  Proxy subscribe  │  │ server │    │                │                 │
//!  ◀════════════════┼══│   ws   │◀───│   broadcast    │◀── store        │
//!                   │  └────────┘    └────────────────┘      ▲          │
//!  Operator         │  ┌────────┐                            │          │
//!  ─────────────────┼─▶│ admin  │────────────────────────────┘          │
//!                   │  └────────┘                                       │
//!                   │  config file ──(notify)──▶ replace + broadcast    │
//!                   └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use mesh_control::config::{apply_overrides, load_config, watcher::ConfigWatcher, ControlConfig};
use mesh_control::lifecycle::{wait_for_signal, Shutdown};
use mesh_control::observability::{logging, metrics};
use mesh_control::ControlServer;

#[derive(Parser)]
#[command(name = "mesh-control")]
#[command(about = "Control plane pushing route configuration to mesh proxies", long_about = None)]
struct Args {
    /// TOML config file, watched for route changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// JSON log output.
    #[arg(long)]
    production: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ControlConfig::default(),
    };
    let config = apply_overrides(config, args.bind, args.production)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mesh-control starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_subscriptions = config.listener.max_subscriptions,
        sink_capacity = config.streaming.sink_capacity,
        routes = config.initial_routes().len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    // Keep the watcher alive for the server's lifetime.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), rx),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (None, rx)
                }
            }
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    let server = ControlServer::new(config, shutdown);
    server.run(listener, config_updates).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
