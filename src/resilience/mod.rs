//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a node:
//!     → timeouts.rs (race the call against its deadline)
//!     → result, the call's own error, or TimedOut
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every remote call has a deadline
//! - No retries: a failed call is reported, the caller decides what next

pub mod timeouts;

pub use timeouts::{Invoker, TimedOut};
