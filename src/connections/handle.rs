//! A live connection to one node.

use std::sync::Arc;

use crate::node::{EndpointId, NodeApi, Provider};

/// The provider for one endpoint plus the typed client built on it.
///
/// Read-only once created; the liveness flag belongs to the provider.
pub struct ConnectionHandle {
    endpoint: EndpointId,
    provider: Arc<dyn Provider>,
    api: NodeApi,
}

impl ConnectionHandle {
    pub fn new(endpoint: EndpointId, api: NodeApi) -> Self {
        Self {
            endpoint,
            provider: api.provider().clone(),
            api,
        }
    }

    pub fn endpoint(&self) -> &EndpointId {
        &self.endpoint
    }

    pub fn api(&self) -> &NodeApi {
        &self.api
    }

    /// Whether the transport is still up.
    pub fn is_live(&self) -> bool {
        self.provider.is_connected()
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("endpoint", &self.endpoint)
            .field("chain", &self.api.chain())
            .field("live", &self.is_live())
            .finish()
    }
}
