//! Liveness and database reachability.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn get_health(State(state): State<AppState>) -> Response {
    match state.database.ping().await {
        Ok(()) => Json(HealthStatus {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            database: "up",
            error: None,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus {
                    status: "degraded",
                    version: env!("CARGO_PKG_VERSION"),
                    database: "down",
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}
