//! Response construction.
//!
//! Upstream responses go back with the upstream's status and body. Errors
//! raised locally use one JSON shape:
//! `{"status_code": <u16>, "error": <message>, "details"?: <string>}`.

use axum::extract::rejection::BytesRejection;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::upstream::{RelayBody, RelayResponse};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        match self.body {
            RelayBody::Json(value) => (self.status, Json(value)).into_response(),
            RelayBody::Text(text) => (
                self.status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                text,
            )
                .into_response(),
        }
    }
}

/// Fallback for paths no route serves.
pub async fn not_found() -> ErrorBody {
    ErrorBody::new(StatusCode::NOT_FOUND, "Not found")
}

/// Fallback for a known path called with a method it does not accept.
pub async fn method_not_allowed() -> ErrorBody {
    ErrorBody::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// An inbound body that could not be buffered, usually because it exceeds
/// `security.max_body_size`.
pub fn body_rejected(rejection: &BytesRejection) -> ErrorBody {
    let status = rejection.status();
    let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "Request body too large"
    } else {
        "Failed to read request body"
    };
    ErrorBody::new(status, error).with_details(rejection.body_text())
}
