//! Responses generated by the balancer itself.
//!
//! Successful upstream responses pass through untouched; everything here is
//! for requests that never reached a backend.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Body of every terminal routing failure.
pub const SERVICE_NOT_AVAILABLE: &str = "Service not available";

pub fn service_unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, SERVICE_NOT_AVAILABLE).into_response()
}

pub fn payload_too_large() -> Response {
    (StatusCode::PAYLOAD_TOO_LARGE, "Request body unreadable or too large").into_response()
}
