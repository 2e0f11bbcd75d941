//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging and metrics from config
//! - Build the connection registry and the dispatcher
//! - Pre-connect every configured node before traffic is accepted
//!
//! # Design Decisions
//! - A node that fails to connect is logged, not fatal
//! - Nodes connect concurrently; one slow node does not delay the others
//!   past its own setup deadline
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::connections::ConnectionRegistry;
use crate::dispatch::{Dispatcher, Namespace};
use crate::node::Connector;
use crate::observability::{logging, metrics};

/// The long-lived pieces the HTTP server is built from.
pub struct Gateway {
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Dispatcher,
}

/// Install the log subscriber and, when enabled, the metrics exporter.
pub fn init_observability(config: &GatewayConfig) {
    logging::init_logging(&config.observability);

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
}

/// Build the registry and dispatcher, then connect the configured nodes.
pub async fn bootstrap(config: &GatewayConfig, connector: Arc<dyn Connector>) -> Gateway {
    let registry = Arc::new(ConnectionRegistry::new(connector, config.timeouts.connect()));
    let dispatcher = Dispatcher::new(config.timeouts.dispatch());

    tracing::info!(
        rpc = dispatcher.table(Namespace::Rpc).len(),
        query = dispatcher.table(Namespace::Query).len(),
        derive = dispatcher.table(Namespace::Derive).len(),
        dispatch_timeout_ms = config.timeouts.dispatch_ms,
        "Method catalog loaded"
    );

    let connected = registry.connect_all(&config.nodes).await;
    tracing::info!(
        configured = config.nodes.len(),
        connected,
        "Node connections established"
    );
    if connected < config.nodes.len() {
        tracing::warn!("Some nodes could not be connected; queries against them will be rejected");
    }

    Gateway { registry, dispatcher }
}
