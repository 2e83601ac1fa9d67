//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment overrides: PORT, UPSTREAM_*, PG* (loader.rs)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → handed to HttpServer::new, shared via Arc by the handlers
//! ```

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::DatabaseConfig;
pub use schema::ProxyConfig;
pub use schema::RetryConfig;
pub use schema::UpstreamConfig;
