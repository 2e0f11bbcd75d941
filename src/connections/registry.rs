//! Endpoint → connection registry.
//!
//! # Responsibilities
//! - Establish at most one connection per endpoint, even under concurrent first use
//! - Bound connection setup time
//! - Record failed setups so the endpoint reads as not connected for good
//! - Answer lookups and liveness queries for the route layer
//!
//! # Design Decisions
//! - One `OnceCell` slot per endpoint: whoever initializes it connects, every
//!   other caller waits on the same cell
//! - A slot holding `None` is a failed setup; it is never retried
//! - Setup failures are logged, never returned as errors

use dashmap::DashMap;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::NodeConfig;
use crate::connections::handle::ConnectionHandle;
use crate::node::{Connector, EndpointId, NodeApi, NodeResult};
use crate::observability::metrics;
use crate::resilience::Invoker;

const SETUP_TIMEOUT_MESSAGE: &str = "Connection could not be established.";

type Slot = Arc<OnceCell<Option<Arc<ConnectionHandle>>>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("An API for {0} needs to be setup before it can be queried")]
    NotConnected(String),
}

/// What a call to [`ConnectionRegistry::connect`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    AlreadySetUp,
    Failed,
}

/// Owns every node connection of the process.
pub struct ConnectionRegistry {
    slots: DashMap<EndpointId, Slot>,
    connector: Arc<dyn Connector>,
    invoker: Invoker,
}

impl ConnectionRegistry {
    pub fn new(connector: Arc<dyn Connector>, connect_timeout: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            connector,
            invoker: Invoker::new(connect_timeout),
        }
    }

    /// Connect `endpoint` through `address` unless it already has a slot.
    pub async fn connect(&self, endpoint: &str, address: &str) -> ConnectOutcome {
        let slot = self.slots.entry(EndpointId::from(endpoint)).or_default().clone();
        if slot.initialized() {
            tracing::info!(endpoint, "An API for this endpoint has already been set up");
            return ConnectOutcome::AlreadySetUp;
        }

        let mut opened_here = false;
        let handle = slot
            .get_or_init(|| {
                opened_here = true;
                self.open(endpoint, address)
            })
            .await;

        if !opened_here {
            tracing::info!(endpoint, "An API for this endpoint has already been set up");
            return ConnectOutcome::AlreadySetUp;
        }
        if handle.is_some() {
            ConnectOutcome::Connected
        } else {
            ConnectOutcome::Failed
        }
    }

    /// Connect every configured node concurrently.
    ///
    /// Returns how many nodes were newly connected by this call.
    pub async fn connect_all(&self, nodes: &[NodeConfig]) -> usize {
        let outcomes = join_all(nodes.iter().map(|node| async move {
            let outcome = self.connect(&node.ws_url, &node.ws_url).await;
            tracing::debug!(node = %node.name, endpoint = %node.ws_url, ?outcome, "Node setup finished");
            outcome
        }))
        .await;

        outcomes
            .into_iter()
            .filter(|outcome| *outcome == ConnectOutcome::Connected)
            .count()
    }

    async fn open(&self, endpoint: &str, address: &str) -> Option<Arc<ConnectionHandle>> {
        tracing::info!(endpoint, address, "Connecting to node");

        let connector = self.connector.clone();
        let outcome: NodeResult<NodeApi> = self
            .invoker
            .invoke(
                |address: String| async move {
                    let provider = connector.connect(&address).await?;
                    NodeApi::create(provider).await
                },
                address.to_string(),
                SETUP_TIMEOUT_MESSAGE,
            )
            .await;

        match outcome {
            Ok(api) => {
                tracing::info!(endpoint, chain = %api.chain(), "Successfully connected to node");
                metrics::record_node_connected(endpoint, true);
                Some(Arc::new(ConnectionHandle::new(EndpointId::from(endpoint), api)))
            }
            Err(e) => {
                tracing::error!(endpoint, error = %e, "Node setup failed; endpoint stays unavailable");
                metrics::record_node_connected(endpoint, false);
                None
            }
        }
    }

    /// Look up the handle of a connected endpoint.
    pub fn resolve(&self, endpoint: &str) -> Result<Arc<ConnectionHandle>, RegistryError> {
        self.slots
            .get(endpoint)
            .and_then(|slot| slot.get().cloned().flatten())
            .ok_or_else(|| RegistryError::NotConnected(endpoint.to_string()))
    }

    /// Endpoints with an established connection, sorted.
    pub fn list_connected(&self) -> Vec<EndpointId> {
        let mut connected: Vec<EndpointId> = self
            .slots
            .iter()
            .filter(|entry| matches!(entry.value().get(), Some(Some(_))))
            .map(|entry| entry.key().clone())
            .collect();
        connected.sort();
        connected
    }

    /// Whether `endpoint` is connected and its transport is up.
    pub fn is_live(&self, endpoint: &str) -> bool {
        self.resolve(endpoint).map(|handle| handle.is_live()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::testing::{ConnectBehavior, StubConnector, StubProvider};
    use serde_json::json;
    use std::time::Instant;

    fn chain_provider() -> Arc<StubProvider> {
        StubProvider::answering(|_, _| Ok(json!("Development")))
    }

    #[tokio::test]
    async fn test_concurrent_connect_creates_one_handle() {
        let connector = StubConnector::with_delay(Duration::from_millis(50), {
            let provider = chain_provider();
            move |_| ConnectBehavior::Succeed(provider.clone())
        });
        let registry = ConnectionRegistry::new(connector.clone(), Duration::from_secs(5));

        let (a, b) = tokio::join!(
            registry.connect("ws://node1", "ws://node1"),
            registry.connect("ws://node1", "ws://node1"),
        );

        assert_eq!(connector.connects(), 1);
        let mut outcomes = vec![a, b];
        outcomes.sort_by_key(|o| *o as u8);
        assert_eq!(outcomes, vec![ConnectOutcome::Connected, ConnectOutcome::AlreadySetUp]);
        assert_eq!(registry.list_connected(), vec![EndpointId::from("ws://node1")]);
    }

    #[tokio::test]
    async fn test_second_connect_is_noop() {
        let connector = StubConnector::always(chain_provider());
        let registry = ConnectionRegistry::new(connector.clone(), Duration::from_secs(5));

        assert_eq!(registry.connect("ws://node1", "ws://node1").await, ConnectOutcome::Connected);
        let first = registry.resolve("ws://node1").unwrap();
        assert_eq!(registry.connect("ws://node1", "ws://node1").await, ConnectOutcome::AlreadySetUp);
        let second = registry.resolve("ws://node1").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test]
    async fn test_failed_endpoint_does_not_block_others() {
        let provider = chain_provider();
        let connector = StubConnector::new(move |address| {
            if address.contains("bad") {
                ConnectBehavior::Refuse
            } else {
                ConnectBehavior::Succeed(provider.clone())
            }
        });
        let registry = ConnectionRegistry::new(connector, Duration::from_secs(5));
        let nodes = vec![
            NodeConfig { name: "bad".into(), ws_url: "ws://bad:9944".into() },
            NodeConfig { name: "good".into(), ws_url: "ws://good:9944".into() },
        ];

        assert_eq!(registry.connect_all(&nodes).await, 1);
        assert_eq!(registry.list_connected(), vec![EndpointId::from("ws://good:9944")]);
        assert_eq!(
            registry.resolve("ws://bad:9944").unwrap_err(),
            RegistryError::NotConnected("ws://bad:9944".into())
        );
    }

    #[tokio::test]
    async fn test_setup_timeout_is_permanent() {
        let connector = StubConnector::new(|_| ConnectBehavior::Hang);
        let registry = ConnectionRegistry::new(connector.clone(), Duration::from_millis(50));

        let started = Instant::now();
        assert_eq!(registry.connect("ws://node1", "ws://node1").await, ConnectOutcome::Failed);
        assert!(started.elapsed() < Duration::from_secs(2));

        let err = registry.resolve("ws://node1").unwrap_err();
        assert_eq!(err.to_string(), "An API for ws://node1 needs to be setup before it can be queried");

        // no automatic retry
        assert_eq!(registry.connect("ws://node1", "ws://node1").await, ConnectOutcome::AlreadySetUp);
        assert_eq!(connector.connects(), 1);
        assert!(registry.list_connected().is_empty());
    }

    #[tokio::test]
    async fn test_node_rejecting_handshake_counts_as_failed_setup() {
        let provider = StubProvider::answering(|_, _| {
            Err(crate::node::NodeError::Rpc { code: -32601, message: "Method not found".into() })
        });
        let registry = ConnectionRegistry::new(StubConnector::always(provider), Duration::from_secs(5));
        assert_eq!(registry.connect("ws://node1", "ws://node1").await, ConnectOutcome::Failed);
        assert!(registry.resolve("ws://node1").is_err());
    }

    #[tokio::test]
    async fn test_is_live_follows_transport() {
        let provider = chain_provider();
        let registry = ConnectionRegistry::new(StubConnector::always(provider.clone()), Duration::from_secs(5));
        registry.connect("ws://node1", "ws://node1").await;

        assert!(registry.is_live("ws://node1"));
        provider.set_connected(false);
        assert!(!registry.is_live("ws://node1"));
        assert!(!registry.is_live("ws://unknown"));
        // the handle stays registered after the transport drops
        assert_eq!(registry.list_connected().len(), 1);
    }

    #[tokio::test]
    async fn test_list_connected_sorted() {
        let registry = ConnectionRegistry::new(StubConnector::always(chain_provider()), Duration::from_secs(5));
        registry.connect("ws://b", "ws://b").await;
        registry.connect("ws://a", "ws://a").await;
        let ids: Vec<String> = registry.list_connected().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["ws://a", "ws://b"]);
    }
}
