//! Remote node subsystem.
//!
//! # Data Flow
//! ```text
//! ws_url
//!     → transport.rs (socket, request/response correlation, liveness flag)
//!     → api.rs (typed calls: rpc / query / derive)
//!     → events.rs (event log records, Slash payloads)
//! ```
//!
//! # Constraints
//! - One socket per node, reused by every request
//! - Every call made through here is bounded by the caller's invoker
//! - A dropped socket is reported, never silently reopened

pub mod api;
pub mod events;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use api::NodeApi;
pub use events::{EventRecord, SlashEvent};
pub use transport::{Connector, Provider, WsConnector, WsProvider};
pub use types::{EndpointId, NodeError, NodeResult};
