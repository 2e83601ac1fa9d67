//! Declarative relay route table.
//!
//! Every proxied endpoint is one `RouteSpec`; the HTTP layer instantiates the
//! same relay handler for each entry. Inbound routes are all `POST` with a
//! JSON object body.

use axum::http::Method;
use serde_json::{Map, Value};

use crate::routing::leave;
use crate::routing::InvalidPayload;

/// Rewrites a validated inbound body into the upstream payload.
pub type PayloadShaper = fn(&mut Map<String, Value>) -> Result<(), InvalidPayload>;

/// Rewrites a parsed upstream JSON body before it is relayed back.
pub type ResponseShaper = fn(&mut Value);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// `timeouts.standard_secs`
    Standard,
    /// `timeouts.extended_secs`
    Extended,
}

#[derive(Debug, Clone)]
pub struct RouteSpec {
    /// Label for logs and metrics.
    pub name: &'static str,
    pub inbound: &'static str,
    pub upstream: &'static str,
    pub upstream_method: Method,
    pub required: &'static [&'static str],
    pub shape_payload: Option<PayloadShaper>,
    pub shape_response: Option<ResponseShaper>,
    pub timeout: TimeoutClass,
}

impl RouteSpec {
    const fn pass_through(
        name: &'static str,
        inbound: &'static str,
        upstream: &'static str,
        upstream_method: Method,
        required: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            inbound,
            upstream,
            upstream_method,
            required,
            shape_payload: None,
            shape_response: None,
            timeout: TimeoutClass::Standard,
        }
    }

    /// Required fields that are absent, null or blank strings.
    pub fn missing_fields(&self, body: &Map<String, Value>) -> Vec<&'static str> {
        self.required
            .iter()
            .copied()
            .filter(|field| match body.get(*field) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .collect()
    }

    /// Validate and reshape an inbound body into the upstream payload.
    pub fn prepare(&self, mut body: Map<String, Value>) -> Result<Map<String, Value>, InvalidPayload> {
        let missing = self.missing_fields(&body);
        if !missing.is_empty() {
            return Err(InvalidPayload::new(format!(
                "Missing required field(s): {}",
                missing.join(", ")
            )));
        }

        if let Some(shape) = self.shape_payload {
            shape(&mut body)?;
        }
        Ok(body)
    }
}

pub static ROUTES: &[RouteSpec] = &[
    RouteSpec {
        name: "admin_leave_approval",
        inbound: "/admin/leave/approval",
        upstream: "/admin/leave/approval",
        upstream_method: Method::POST,
        required: &["id", "admin_id", "user_id", "status"],
        shape_payload: Some(leave::admin_decision),
        shape_response: None,
        timeout: TimeoutClass::Extended,
    },
    RouteSpec {
        name: "leave_grant_approval",
        inbound: "/api/leave/grant/approval",
        upstream: "/leave/grant/approval",
        upstream_method: Method::POST,
        required: &["id", "approver_id", "user_id", "is_approved"],
        shape_payload: Some(leave::approver_decision),
        shape_response: None,
        timeout: TimeoutClass::Extended,
    },
    RouteSpec::pass_through(
        "leave_grant_request",
        "/api/leave/grant/request",
        "/leave/grant/request",
        Method::POST,
        &["user_id", "approver_id", "days"],
    ),
    RouteSpec {
        name: "leave_grant_request_list",
        inbound: "/api/leave/grant/getRequestList",
        upstream: "/leave/grant/getRequestList",
        upstream_method: Method::POST,
        required: &["user_id"],
        shape_payload: None,
        shape_response: Some(leave::label_cancel_requests),
        timeout: TimeoutClass::Standard,
    },
    RouteSpec::pass_through(
        "leave_grant_management",
        "/api/leave/grant/management",
        "/leave/grant/management",
        Method::POST,
        &["admin_id"],
    ),
    RouteSpec::pass_through(
        "leave_grant_cancel",
        "/api/leave/grant/cancel",
        "/leave/grant/cancel",
        Method::POST,
        &["id", "user_id"],
    ),
    RouteSpec::pass_through("user_update", "/api/user/update", "/user/update", Method::PUT, &["user_id"]),
    RouteSpec::pass_through("user_delete", "/api/user/delete", "/user/delete", Method::DELETE, &["user_id"]),
    RouteSpec::pass_through(
        "user_password_reset",
        "/api/user/password/reset",
        "/user/password/reset",
        Method::POST,
        &["user_id"],
    ),
    RouteSpec::pass_through(
        "user_password_change",
        "/api/user/password/change",
        "/user/password/change",
        Method::POST,
        &["user_id", "password"],
    ),
    RouteSpec::pass_through("file_url_sign", "/api/file/url/sign", "/file/url/sign", Method::POST, &["file_key"]),
    RouteSpec::pass_through(
        "file_url_sign_batch",
        "/api/file/url/signBatch",
        "/file/url/signBatch",
        Method::POST,
        &["file_keys"],
    ),
    RouteSpec::pass_through("approver_list", "/api/approver/list", "/approver/list", Method::POST, &["organization_id"]),
    RouteSpec::pass_through(
        "approver_add",
        "/api/approver/add",
        "/approver/add",
        Method::POST,
        &["organization_id", "user_id"],
    ),
    RouteSpec::pass_through("approver_update", "/api/approver/update", "/approver/update", Method::PUT, &["id", "user_id"]),
    RouteSpec::pass_through("approver_delete", "/api/approver/delete", "/approver/delete", Method::DELETE, &["id"]),
];

pub fn find_route(inbound: &str) -> Option<&'static RouteSpec> {
    ROUTES.iter().find(|route| route.inbound == inbound)
}
