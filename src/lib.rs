//! HR console backend: leave-grant approval proxy and upstream relay.

pub mod config;
pub mod db;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
