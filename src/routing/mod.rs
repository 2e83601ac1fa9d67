//! Relay routing subsystem.
//!
//! # Data Flow
//! ```text
//! inbound JSON object
//!     → table.rs (find RouteSpec, required-field check)
//!     → leave.rs (payload shapers for the approval routes)
//!     → outbound payload for the forwarder
//!
//! upstream JSON body
//!     → leave.rs (response shaper for the request history)
//! ```

pub mod leave;
pub mod table;

use thiserror::Error;

pub use table::{find_route, RouteSpec, TimeoutClass, ROUTES};

/// Inbound body rejected before anything is sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidPayload(String);

impl InvalidPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
