//! Node-facing types and error definitions.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::resilience::TimedOut;

/// Identifier of a remote node: the address clients name it by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(Arc<str>);

impl EndpointId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EndpointId {
    fn from(id: &str) -> Self {
        Self(Arc::from(id))
    }
}

impl From<String> for EndpointId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl Borrow<str> for EndpointId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur while talking to a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Opening the socket failed or the socket errored.
    #[error("transport error: {0}")]
    Transport(String),

    /// The socket is closed; the call never reached the node or its answer was lost.
    #[error("connection to node closed")]
    Disconnected,

    /// The node answered with a JSON-RPC error object.
    #[error("{code}: {message}")]
    Rpc { code: i64, message: String },

    /// The call did not finish before its deadline.
    #[error("{0}")]
    Timeout(String),

    /// The node answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A multi-step call failed; the message names the call, not the step.
    #[error("{0}")]
    Failed(String),
}

impl From<TimedOut> for NodeError {
    fn from(t: TimedOut) -> Self {
        NodeError::Timeout(t.0)
    }
}

/// Result type for node operations.
pub type NodeResult<T> = Result<T, NodeError>;
