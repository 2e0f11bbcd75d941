//! Typed client over a node provider.
//!
//! # Responsibilities
//! - Name remote calls by section and method instead of raw wire strings
//! - Check the node answers before a connection is handed out
//! - Decode the event log into [`EventRecord`]s
//!
//! # Wire naming
//! - rpc calls: `<section>_<method>` (the node's native JSON-RPC names)
//! - storage queries: `query_<section>_<storage>`, or
//!   `query_<section>_<storage>_at` with the block hash as first param
//! - derived queries: `derive_<section>_<method>`

use serde_json::Value;
use std::sync::Arc;

use crate::node::events::EventRecord;
use crate::node::transport::Provider;
use crate::node::types::{NodeError, NodeResult};

/// Typed client sharing one provider.
#[derive(Clone)]
pub struct NodeApi {
    provider: Arc<dyn Provider>,
    chain: String,
}

impl NodeApi {
    /// Build the client, confirming the node answers `system_chain`.
    pub async fn create(provider: Arc<dyn Provider>) -> NodeResult<Self> {
        let chain = match provider.request("system_chain", Vec::new()).await? {
            Value::String(name) => name,
            other => other.to_string(),
        };
        Ok(Self { provider, chain })
    }

    /// Chain name reported by the node at connect time.
    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub async fn rpc(&self, section: &str, method: &str, args: Vec<Value>) -> NodeResult<Value> {
        self.provider.request(&format!("{section}_{method}"), args).await
    }

    pub async fn query(&self, section: &str, storage: &str, args: Vec<Value>) -> NodeResult<Value> {
        self.provider.request(&format!("query_{section}_{storage}"), args).await
    }

    /// Storage query evaluated at the state of block `at`.
    pub async fn query_at(
        &self,
        section: &str,
        storage: &str,
        at: &str,
        args: Vec<Value>,
    ) -> NodeResult<Value> {
        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(Value::String(at.to_string()));
        params.extend(args);
        self.provider.request(&format!("query_{section}_{storage}_at"), params).await
    }

    pub async fn derive(&self, section: &str, method: &str, args: Vec<Value>) -> NodeResult<Value> {
        self.provider.request(&format!("derive_{section}_{method}"), args).await
    }

    /// Decode an event log returned by `system.events`.
    ///
    /// Records that do not have the expected shape are skipped.
    pub fn decode_events(raw: Value) -> NodeResult<Vec<EventRecord>> {
        let Value::Array(entries) = raw else {
            return Err(NodeError::InvalidResponse("event log is not an array".to_string()));
        };
        let total = entries.len();
        let records: Vec<EventRecord> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping undecodable event record");
                    None
                }
            })
            .collect();
        if records.len() < total {
            tracing::debug!(total, decoded = records.len(), "Event log partially decoded");
        }
        Ok(records)
    }
}

impl std::fmt::Debug for NodeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeApi")
            .field("chain", &self.chain)
            .field("connected", &self.provider.is_connected())
            .finish()
    }
}
