//! Envelope → HTTP response mapping.
//!
//! # Design Decisions
//! - `{result}` is 200, `{error}` is 400; there are no other statuses
//! - A dead transport replaces whatever the dispatcher said with
//!   [`LOST_CONNECTION`]

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::dispatch::Envelope;
use crate::observability::metrics;

pub const LOST_CONNECTION: &str = "Lost connection with node.";

pub const REQUEST_SUCCESS_STATUS: StatusCode = StatusCode::OK;
pub const REQUEST_ERROR_STATUS: StatusCode = StatusCode::BAD_REQUEST;

/// Replace an error with [`LOST_CONNECTION`] when the node's transport is down.
pub fn with_liveness(envelope: Envelope, live: bool) -> Envelope {
    match envelope {
        Envelope::Error(_) if !live => Envelope::error(LOST_CONNECTION),
        other => other,
    }
}

pub fn status_of(envelope: &Envelope) -> StatusCode {
    if envelope.is_ok() {
        REQUEST_SUCCESS_STATUS
    } else {
        REQUEST_ERROR_STATUS
    }
}

/// Final response for `route`, counted in the HTTP metrics.
pub fn reply(route: &'static str, envelope: Envelope) -> Response {
    let status = status_of(&envelope);
    metrics::record_http(route, status.as_u16());
    (status, Json(envelope)).into_response()
}
