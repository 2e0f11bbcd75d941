//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (request ID, trace span)
//!     → server.rs (route, websocket → ConnectionHandle, query string → Params)
//!     → dispatch (method call against the node)
//!     → response.rs (liveness override, envelope → 200/400)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::LOST_CONNECTION;
pub use server::{build_router, AppState, GatewayServer};
