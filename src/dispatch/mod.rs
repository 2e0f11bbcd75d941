//! Method dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! (namespace, method, params) + ConnectionHandle
//!     → dispatcher.rs (method check, contract check, deadline)
//!     → rpc.rs / query.rs / derive.rs (handler tables)
//!     → composite.rs (nested dispatches: active era, slash totals)
//!     → envelope.rs ({result} | {error})
//! ```
//!
//! # Design Decisions
//! - Tables are data: each entry is a name, a parameter contract and a handler
//! - Missing required parameters are rejected before any remote call
//! - Nothing in here returns an error to the caller; failures are envelopes

pub mod composite;
pub mod contract;
pub mod derive;
pub mod dispatcher;
pub mod envelope;
pub mod query;
pub mod rpc;
pub mod table;

pub use contract::{ParamSpec, Params};
pub use dispatcher::{CatalogEntry, Dispatcher, INVALID_METHOD, NO_METHOD};
pub use envelope::Envelope;
pub use table::{Call, MethodTable, Namespace};
