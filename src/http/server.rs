//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the app state once (forwarder, database, compiled routes)
//! - Create the Axum router: one relay route per route table entry,
//!   `/health`, JSON 404 and 405 fallbacks
//! - Wire up middleware (request id, tracing, body limit)
//! - Serve until the shutdown signal fires

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::db::Database;
use crate::http::health::get_health;
use crate::http::relay::{self, RelayRoute};
use crate::http::request::request_span;
use crate::http::response::{method_not_allowed, not_found};
use crate::routing::ROUTES;
use crate::upstream::{Forwarder, ReqwestTransport, TransportSetupError, UpstreamTransport};

/// Application state injected into handlers. Built once; read-only.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Forwarder,
    pub database: Database,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("upstream client: {0}")]
    Transport(#[from] TransportSetupError),
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a server talking to the configured upstream over reqwest.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let transport = ReqwestTransport::from_config(&config.upstream)?;
        tracing::info!(upstream = %transport.base_url(), "Upstream configured");
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a server with a caller-supplied transport.
    pub fn with_transport(config: ProxyConfig, transport: Arc<dyn UpstreamTransport>) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            forwarder: Forwarder::new(transport),
            database: Database::connect_lazy(&config.database),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new().route("/health", get(get_health));

        for spec in ROUTES {
            let route = Arc::new(RelayRoute::compile(spec, config));
            tracing::debug!(
                inbound = spec.inbound,
                upstream = spec.upstream,
                timeout = ?route.timeout,
                retried = route.retry.is_some(),
                "Registering relay route"
            );
            router = router.route(
                spec.inbound,
                post(move |State(state): State<AppState>, body: Result<Bytes, BytesRejection>| {
                    let route = route.clone();
                    async move { relay::handle(state, route, body).await }
                }),
            );
        }

        // The body limit applies in the `Bytes` extractor; relay::handle
        // turns the rejection into an ErrorBody.
        router
            .method_not_allowed_fallback(method_not_allowed)
            .fallback(not_found)
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = ROUTES.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
