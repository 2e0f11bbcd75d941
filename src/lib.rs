//! Substrate Node Gateway Library

pub mod config;
pub mod connections;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod node;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use connections::ConnectionRegistry;
pub use dispatch::{Dispatcher, Envelope};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
