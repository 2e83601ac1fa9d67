//! Inbound request handling.
//!
//! # Responsibilities
//! - Request ids (`x-request-id`, UUID v4 unless the caller sent one)
//! - Per-request tracing span carrying the id
//! - Decoding the JSON object body every relay route expects

use axum::body::Body;
use axum::http::Request;
use serde_json::{Map, Value};
use tracing::Span;

use crate::routing::InvalidPayload;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Span for `TraceLayer`; runs after the id has been assigned.
pub fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

/// Decode a relay body. An empty body is an empty object; anything other
/// than a JSON object is rejected.
pub fn parse_json_object(bytes: &[u8]) -> Result<Map<String, Value>, InvalidPayload> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(InvalidPayload::new("Request body must be a JSON object")),
    }
}
