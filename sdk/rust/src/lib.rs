//! Client for the Substrate node gateway's HTTP API.

mod client;

pub use client::{Envelope, GatewayClient};
