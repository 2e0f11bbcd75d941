//! Node connection management.
//!
//! # Data Flow
//! ```text
//! startup / config reload / GET /api/pingNode
//!     → registry.rs (one slot per endpoint, bounded setup)
//!     → handle.rs (provider + NodeApi for a connected endpoint)
//!     → dispatch (resolve endpoint → handle)
//! ```

pub mod handle;
pub mod registry;

pub use handle::ConnectionHandle;
pub use registry::{ConnectOutcome, ConnectionRegistry, RegistryError};
