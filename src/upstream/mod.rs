//! Upstream API access.
//!
//! # Data Flow
//! ```text
//! relay handler
//!     → forwarder.rs (deadline, JSON-or-text body)
//!     → transport.rs (UpstreamTransport; reqwest in production)
//!     → upstream API
//! ```

pub mod forwarder;
pub mod transport;

pub use forwarder::{Forwarder, RelayBody, RelayResponse};
pub use transport::{
    OutboundRequest, ReqwestTransport, TransportError, TransportSetupError, UpstreamResponse,
    UpstreamTransport,
};
