//! Payload and response shaping for the leave-grant routes.
//!
//! The two approval routes come from different clients: the admin console
//! sends an enum `status`, the mobile approver sends `is_approved` as Y/N or a
//! boolean. Both are reconciled here to the upstream's enum.

use serde_json::{Map, Value};

use crate::routing::InvalidPayload;

pub const APPROVED: &str = "APPROVED";
pub const REJECTED: &str = "REJECTED";
pub const CANCELLED: &str = "CANCELLED";

const CANCEL_REQUESTED: &str = "CANCEL_REQUESTED";
const CANCEL_REQUESTED_LABEL: &str = "취소대기";

/// `/admin/leave/approval`: `status` must name a decision; case is normalized.
pub fn admin_decision(body: &mut Map<String, Value>) -> Result<(), InvalidPayload> {
    let normalized = body
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| matches!(s.as_str(), APPROVED | REJECTED | CANCELLED))
        .ok_or_else(|| {
            InvalidPayload::new(format!(
                "Invalid status: must be one of {APPROVED}, {REJECTED}, {CANCELLED}"
            ))
        })?;

    body.insert("status".to_string(), Value::String(normalized));
    Ok(())
}

/// `/api/leave/grant/approval`: `is_approved` Y/true → APPROVED, N/false →
/// REJECTED; values already in enum form pass unchanged.
pub fn approver_decision(body: &mut Map<String, Value>) -> Result<(), InvalidPayload> {
    let decision = match body.get("is_approved") {
        Some(Value::Bool(true)) => APPROVED,
        Some(Value::Bool(false)) => REJECTED,
        Some(Value::String(s)) => match s.trim() {
            "Y" | "true" => APPROVED,
            "N" | "false" => REJECTED,
            APPROVED => APPROVED,
            REJECTED => REJECTED,
            _ => return Err(invalid_decision()),
        },
        _ => return Err(invalid_decision()),
    };

    body.insert("is_approved".to_string(), Value::String(decision.to_string()));
    Ok(())
}

fn invalid_decision() -> InvalidPayload {
    InvalidPayload::new("Invalid is_approved: expected Y, N, true, false, APPROVED or REJECTED")
}

/// Request history: show pending cancellations with their display label.
pub fn label_cancel_requests(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if key == "status" && field.as_str() == Some(CANCEL_REQUESTED) {
                    *field = Value::String(CANCEL_REQUESTED_LABEL.to_string());
                } else {
                    label_cancel_requests(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(label_cancel_requests),
        _ => {}
    }
}
