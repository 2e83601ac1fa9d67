//! Generic relay handler.
//!
//! Every `RouteSpec` is compiled into a `RelayRoute` once at startup (timeout
//! and retry policy resolved from config) and served by the same handler:
//! decode → validate/shape → forward (optionally retried) → relay back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::http::request::parse_json_object;
use crate::http::response::{body_rejected, ErrorBody};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::{retry_with_backoff, RetryExhausted, RetryPolicy};
use crate::routing::{InvalidPayload, RouteSpec, TimeoutClass};
use crate::upstream::{Forwarder, OutboundRequest, RelayBody, RelayResponse, TransportError};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Invalid(#[from] InvalidPayload),

    #[error("Upstream request failed: {0}")]
    Transport(TransportError),

    #[error("Upstream request failed after retries: {}", .0.last_error)]
    Exhausted(RetryExhausted<TransportError>),

    #[error("relay task aborted: {0}")]
    Aborted(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Invalid(_) => StatusCode::BAD_REQUEST,
            RelayError::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Transport(_) | RelayError::Exhausted(_) => StatusCode::BAD_GATEWAY,
            RelayError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let status = self.status();
        match self {
            RelayError::Invalid(e) => ErrorBody::new(status, e.to_string()),
            RelayError::Transport(e) if e.is_timeout() => {
                ErrorBody::new(status, "Upstream request timed out").with_details(e.to_string())
            }
            RelayError::Transport(e) => {
                ErrorBody::new(status, "Upstream request failed").with_details(e.to_string())
            }
            RelayError::Exhausted(e) => ErrorBody::new(status, "Upstream request failed after retries")
                .with_details(e.last_error.to_string()),
            RelayError::Aborted(_) => ErrorBody::new(status, "Internal server error"),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        self.to_body().into_response()
    }
}

/// A route table entry with its configuration resolved.
#[derive(Debug, Clone)]
pub struct RelayRoute {
    pub spec: &'static RouteSpec,
    pub timeout: Duration,
    /// `None` for routes that surface the first transport failure.
    pub retry: Option<RetryPolicy>,
}

impl RelayRoute {
    pub fn compile(spec: &'static RouteSpec, config: &ProxyConfig) -> Self {
        let timeout = match spec.timeout {
            TimeoutClass::Standard => config.timeouts.standard(),
            TimeoutClass::Extended => config.timeouts.extended(),
        };
        let retry = config
            .retries
            .routes
            .iter()
            .any(|path| path == spec.inbound)
            .then(|| RetryPolicy::from_config(&config.retries));

        Self { spec, timeout, retry }
    }

    /// Validate, forward and shape one inbound body.
    pub async fn execute(
        &self,
        forwarder: &Forwarder,
        body: Map<String, Value>,
    ) -> Result<RelayResponse, RelayError> {
        let payload = self.spec.prepare(body)?;
        let request = OutboundRequest::json(
            self.spec.upstream_method.clone(),
            self.spec.upstream,
            payload,
            self.timeout,
        );

        let mut response = match &self.retry {
            Some(policy) => retry_with_backoff(self.spec.name, policy, |_| forwarder.forward(&request))
                .await
                .map_err(RelayError::Exhausted)?,
            None => forwarder
                .forward(&request)
                .await
                .map_err(RelayError::Transport)?,
        };

        if let (Some(shape), RelayBody::Json(value)) = (self.spec.shape_response, &mut response.body) {
            shape(value);
        }
        Ok(response)
    }
}

/// Axum entry point shared by every relay route.
///
/// The relay runs on its own task: a client that disconnects does not
/// cancel the upstream call, which completes or times out on its own.
pub async fn handle(
    state: AppState,
    route: Arc<RelayRoute>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start = Instant::now();
    let name = route.spec.name;

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(route = name, error = %rejection.body_text(), "Unreadable request body");
            let response = body_rejected(&rejection).into_response();
            metrics::record_request(name, response.status().as_u16(), start);
            return response;
        }
    };

    let outcome = match parse_json_object(&body) {
        Ok(body) => {
            let forwarder = state.forwarder.clone();
            let task = tokio::spawn(async move { route.execute(&forwarder, body).await });
            task.await
                .unwrap_or_else(|e| Err(RelayError::Aborted(e.to_string())))
        }
        Err(e) => Err(RelayError::Invalid(e)),
    };

    let response = match outcome {
        Ok(relayed) => {
            tracing::info!(route = name, status = %relayed.status, elapsed = ?start.elapsed(), "Relayed");
            relayed.into_response()
        }
        Err(e @ RelayError::Invalid(_)) => {
            tracing::warn!(route = name, error = %e, "Rejected inbound request");
            e.into_response()
        }
        Err(e) => {
            tracing::error!(route = name, error = %e, elapsed = ?start.elapsed(), "Relay failed");
            e.into_response()
        }
    };

    metrics::record_request(name, response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::find_route;
    use crate::upstream::transport::{MockUpstreamTransport, UpstreamResponse, UpstreamTransport};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant as TokioInstant;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn route(path: &str) -> RelayRoute {
        RelayRoute::compile(find_route(path).unwrap(), &ProxyConfig::default())
    }

    fn ok_response() -> UpstreamResponse {
        UpstreamResponse {
            status: StatusCode::OK,
            body: br#"{"status_code":200,"message":"approved"}"#.to_vec(),
        }
    }

    fn refused() -> TransportError {
        TransportError::Connect("connection refused".to_string())
    }

    fn approval() -> Map<String, Value> {
        object(json!({"id": 10, "approver_id": 2, "user_id": 5, "is_approved": "Y"}))
    }

    /// Transport that fails `failures` times, then answers `ok_response()`.
    fn flaky_transport(failures: u32, calls: Arc<AtomicU32>) -> MockUpstreamTransport {
        let mut transport = MockUpstreamTransport::new();
        transport.expect_send().returning(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) < failures {
                Err(refused())
            } else {
                Ok(ok_response())
            }
        });
        transport
    }

    #[test]
    fn default_config_retries_only_the_approvals() {
        let retried: Vec<_> = crate::routing::ROUTES
            .iter()
            .map(|spec| RelayRoute::compile(spec, &ProxyConfig::default()))
            .filter(|route| route.retry.is_some())
            .map(|route| route.spec.inbound)
            .collect();
        assert_eq!(retried, vec!["/admin/leave/approval", "/api/leave/grant/approval"]);
    }

    #[test]
    fn timeouts_follow_the_route_class() {
        assert_eq!(route("/api/leave/grant/approval").timeout, Duration::from_secs(30));
        assert_eq!(route("/api/user/delete").timeout, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_with_growing_delays() {
        for failures in 0..3u32 {
            let calls = Arc::new(AtomicU32::new(0));
            let forwarder = Forwarder::new(Arc::new(flaky_transport(failures, calls.clone())));
            let start = TokioInstant::now();

            let response = route("/api/leave/grant/approval")
                .execute(&forwarder, approval())
                .await
                .unwrap();

            let expected_wait: u64 = (1..=failures).map(|n| 1u64 << n).sum();
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.body, RelayBody::Json(json!({"status_code": 200, "message": "approved"})));
            assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
            assert_eq!(start.elapsed(), Duration::from_secs(expected_wait));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn four_failures_exhaust_the_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let forwarder = Forwarder::new(Arc::new(flaky_transport(u32::MAX, calls.clone())));

        let err = route("/admin/leave/approval")
            .execute(
                &forwarder,
                object(json!({"id": 1, "admin_id": 2, "user_id": 3, "status": "APPROVED"})),
            )
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            serde_json::to_value(err.to_body()).unwrap(),
            json!({
                "status_code": 502,
                "error": "Upstream request failed after retries",
                "details": "connection failed: connection refused"
            })
        );
    }

    /// Accepts every send and never answers.
    struct SilentUpstream {
        sends: Arc<AtomicU32>,
    }

    #[async_trait]
    impl UpstreamTransport for SilentUpstream {
        async fn send(&self, _request: &OutboundRequest) -> Result<UpstreamResponse, TransportError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn approval_timeouts_are_retried_then_give_up() {
        let sends = Arc::new(AtomicU32::new(0));
        let forwarder = Forwarder::new(Arc::new(SilentUpstream { sends: sends.clone() }));
        let start = TokioInstant::now();

        let err = route("/api/leave/grant/approval")
            .execute(&forwarder, approval())
            .await
            .unwrap_err();

        assert_eq!(sends.load(Ordering::SeqCst), 4);
        // four 30s deadlines plus 2s + 4s + 8s of backoff
        assert_eq!(start.elapsed(), Duration::from_secs(4 * 30 + 2 + 4 + 8));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            serde_json::to_value(err.to_body()).unwrap(),
            json!({
                "status_code": 502,
                "error": "Upstream request failed after retries",
                "details": "no response within 30000ms"
            })
        );
    }

    #[tokio::test]
    async fn upstream_rejections_are_not_retried() {
        let mut transport = MockUpstreamTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(UpstreamResponse {
                status: StatusCode::BAD_REQUEST,
                body: br#"{"error":"already decided"}"#.to_vec(),
            })
        });
        let forwarder = Forwarder::new(Arc::new(transport));

        let response = route("/api/leave/grant/approval")
            .execute(&forwarder, approval())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body, RelayBody::Json(json!({"error": "already decided"})));
    }

    #[tokio::test]
    async fn missing_fields_never_reach_the_transport() {
        let mut transport = MockUpstreamTransport::new();
        transport.expect_send().times(0);
        let forwarder = Forwarder::new(Arc::new(transport));

        let err = route("/api/leave/grant/approval")
            .execute(&forwarder, object(json!({"id": 10, "is_approved": "Y"})))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(err.to_body()).unwrap(),
            json!({"status_code": 400, "error": "Missing required field(s): approver_id, user_id"})
        );
    }

    #[tokio::test]
    async fn yes_is_forwarded_as_approved() {
        let mut transport = MockUpstreamTransport::new();
        transport
            .expect_send()
            .withf(|request| {
                request.path == "/leave/grant/approval"
                    && request.body == r#"{"id":10,"approver_id":2,"user_id":5,"is_approved":"APPROVED"}"#
            })
            .times(1)
            .returning(|_| Ok(ok_response()));
        let forwarder = Forwarder::new(Arc::new(transport));

        route("/api/leave/grant/approval")
            .execute(&forwarder, approval())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn repeated_approvals_are_independent() {
        let mut transport = MockUpstreamTransport::new();
        transport.expect_send().times(2).returning(|_| Ok(ok_response()));
        let forwarder = Forwarder::new(Arc::new(transport));
        let route = route("/api/leave/grant/approval");

        let first = route.execute(&forwarder, approval()).await.unwrap();
        let second = route.execute(&forwarder, approval()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn pass_through_body_is_forwarded_verbatim() {
        let inbound = r#"{"user_id":7,"name":"박지민","phone":null,"roles":["admin",{"scope":"hr"}],"active":true}"#;
        let mut transport = MockUpstreamTransport::new();
        transport
            .expect_send()
            .withf(move |request| request.body == inbound && request.method == axum::http::Method::PUT)
            .times(1)
            .returning(|_| Ok(ok_response()));
        let forwarder = Forwarder::new(Arc::new(transport));

        let body = parse_json_object(inbound.as_bytes()).unwrap();
        route("/api/user/update").execute(&forwarder, body).await.unwrap();
    }

    #[tokio::test]
    async fn unretried_route_surfaces_the_first_failure() {
        let mut transport = MockUpstreamTransport::new();
        transport.expect_send().times(1).returning(|_| Err(refused()));
        let forwarder = Forwarder::new(Arc::new(transport));

        let err = route("/api/user/password/reset")
            .execute(&forwarder, object(json!({"user_id": 1})))
            .await
            .unwrap_err();

        assert_eq!(
            serde_json::to_value(err.to_body()).unwrap(),
            json!({
                "status_code": 502,
                "error": "Upstream request failed",
                "details": "connection failed: connection refused"
            })
        );
    }

    #[test]
    fn timeouts_map_to_gateway_timeout() {
        let err = RelayError::Transport(TransportError::Timeout(Duration::from_secs(10)));
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            serde_json::to_value(err.to_body()).unwrap(),
            json!({
                "status_code": 504,
                "error": "Upstream request timed out",
                "details": "no response within 10000ms"
            })
        );
    }

    #[tokio::test]
    async fn history_statuses_are_labelled() {
        let mut transport = MockUpstreamTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(UpstreamResponse {
                status: StatusCode::OK,
                body: br#"{"data":[{"id":1,"status":"CANCEL_REQUESTED"}]}"#.to_vec(),
            })
        });
        let forwarder = Forwarder::new(Arc::new(transport));

        let response = route("/api/leave/grant/getRequestList")
            .execute(&forwarder, object(json!({"user_id": 5})))
            .await
            .unwrap();

        assert_eq!(
            response.body,
            RelayBody::Json(json!({"data": [{"id": 1, "status": "취소대기"}]}))
        );
    }
}
