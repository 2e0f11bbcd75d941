//! Substrate Node Gateway
//!
//! An HTTP gateway in front of one or more Substrate nodes, built with Tokio
//! and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────┐
//!                              │                     GATEWAY                       │
//!                              │                                                   │
//!     Client Request           │  ┌─────────┐    ┌─────────────┐    ┌───────────┐  │
//!     ─────────────────────────┼─▶│  http   │───▶│ connections │───▶│ dispatch  │  │
//!                              │  │ server  │    │  registry   │    │  tables   │  │
//!                              │  └─────────┘    └─────────────┘    └─────┬─────┘  │
//!                              │                                          │        │
//!                              │                                          ▼        │
//!     Client Response          │  ┌─────────┐                       ┌───────────┐  │
//!     ◀────────────────────────┼──│envelope │◀──────────────────────│   node    │◀─┼──── Substrate
//!                              │  │200 / 400│                       │ ws client │  │     node
//!                              │  └─────────┘                       └───────────┘  │
//!                              │                                                   │
//!                              │  ┌──────────────────────────────────────────────┐ │
//!                              │  │            Cross-Cutting Concerns             │ │
//!                              │  │  config · observability · resilience ·       │ │
//!                              │  │  lifecycle                                    │ │
//!                              │  └──────────────────────────────────────────────┘ │
//!                              └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use substrate_gateway::config::loader::load_config;
use substrate_gateway::config::watcher::ConfigWatcher;
use substrate_gateway::config::GatewayConfig;
use substrate_gateway::http::GatewayServer;
use substrate_gateway::lifecycle::{bootstrap, init_observability, Shutdown};
use substrate_gateway::node::WsConnector;

#[derive(Parser)]
#[command(name = "substrate-gateway")]
#[command(about = "HTTP gateway to Substrate nodes", version)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    init_observability(&config);
    tracing::info!("substrate-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        nodes = config.nodes.len(),
        connect_timeout_ms = config.timeouts.connect_ms,
        dispatch_timeout_ms = config.timeouts.dispatch_ms,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let gateway = bootstrap(&config, Arc::new(WsConnector)).await;

    // The watcher must outlive the server; dropping it stops the reloads.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(active) => (Some(active), updates),
                Err(e) => {
                    tracing::error!(error = %e, "Config watcher could not start; hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.trigger_on_signal().await }
    });

    let server = GatewayServer::new(&config, gateway.registry, gateway.dispatcher);
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
