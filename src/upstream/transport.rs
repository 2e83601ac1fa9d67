//! One HTTP exchange with the upstream API.
//!
//! `UpstreamTransport` is the seam between the relay and the network: it
//! returns `Ok` whenever a complete HTTP response arrived, whatever its
//! status, and `Err` only when no complete response was received.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, Method, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;
use crate::resilience::DeadlineExceeded;

/// A JSON request bound for the upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    /// Upstream path, starting with '/'.
    pub path: String,
    /// Serialized JSON object.
    pub body: String,
    pub timeout: Duration,
}

impl OutboundRequest {
    pub fn json(method: Method, path: impl Into<String>, body: Map<String, Value>, timeout: Duration) -> Self {
        Self {
            method,
            path: path.into(),
            body: Value::Object(body).to_string(),
            timeout,
        }
    }

    /// Byte length of the UTF-8 payload, sent as `Content-Length`.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// A complete upstream response, body not yet interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Failure to obtain a complete HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("response body incomplete: {0}")]
    Body(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

impl From<DeadlineExceeded> for TransportError {
    fn from(e: DeadlineExceeded) -> Self {
        TransportError::Timeout(e.0)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<UpstreamResponse, TransportError>;
}

/// Pooled keep-alive client for `{scheme}://{host}:{port}`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Error)]
pub enum TransportSetupError {
    #[error("invalid upstream address: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl ReqwestTransport {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, TransportSetupError> {
        let base_url = Url::parse(&format!("{}://{}:{}", config.scheme, config.host, config.port))?;
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .no_proxy()
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl UpstreamTransport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<UpstreamResponse, TransportError> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|e| TransportError::Connect(format!("invalid path {}: {e}", request.path)))?;

        let mut response = self
            .client
            .request(request.method.clone(), url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| TransportError::Connect(describe(&e)))?;

        let status = response.status();
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TransportError::Body(describe(&e)))?
        {
            body.extend_from_slice(&chunk);
        }

        Ok(UpstreamResponse { status, body })
    }
}

/// Flatten an error and its sources into one line.
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
