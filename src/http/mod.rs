//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request id, JSON object body)
//!     → relay.rs (route table entry → forwarder → upstream)
//!     → response.rs (upstream status/body, or local JSON error)
//!     → Send to client
//! ```

pub mod health;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;

pub use relay::{RelayError, RelayRoute};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, StartupError};
