//! HTTP proxy forwarder.
//!
//! Sends one `OutboundRequest` under its deadline and interprets the body:
//! JSON when it parses, raw text otherwise. The status is never translated.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::Value;

use crate::resilience::with_deadline;
use crate::upstream::transport::{OutboundRequest, TransportError, UpstreamResponse, UpstreamTransport};

/// Upstream body as it will be relayed to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayBody {
    Json(Value),
    Text(String),
}

impl RelayBody {
    pub fn parse(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(value) => RelayBody::Json(value),
            Err(_) => RelayBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Upstream status and interpreted body.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub body: RelayBody,
}

impl From<UpstreamResponse> for RelayResponse {
    fn from(response: UpstreamResponse) -> Self {
        Self {
            status: response.status,
            body: RelayBody::parse(&response.body),
        }
    }
}

#[derive(Clone)]
pub struct Forwarder {
    transport: Arc<dyn UpstreamTransport>,
}

impl Forwarder {
    pub fn new(transport: Arc<dyn UpstreamTransport>) -> Self {
        Self { transport }
    }

    /// One attempt, no retry. A missed deadline drops the in-flight exchange.
    pub async fn forward(&self, request: &OutboundRequest) -> Result<RelayResponse, TransportError> {
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            content_length = request.content_length(),
            timeout = ?request.timeout,
            "Forwarding to upstream"
        );

        let response = with_deadline(request.timeout, self.transport.send(request)).await??;

        tracing::debug!(
            path = %request.path,
            status = %response.status,
            bytes = response.body.len(),
            "Upstream responded"
        );
        Ok(response.into())
    }
}
