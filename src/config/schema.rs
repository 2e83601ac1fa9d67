//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML file; every
//! field has a default so an empty file (or no file at all) is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Upstream API the relay forwards to.
    pub upstream: UpstreamConfig,

    /// Outbound timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// PostgreSQL connection settings.
    pub database: DatabaseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Listen port (`PORT`).
    pub port: u16,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9999,
        }
    }
}

/// Upstream API location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// "https" in production; "http" for local upstreams.
    pub scheme: String,

    /// Upstream host (`UPSTREAM_HOST`).
    pub host: String,

    /// Upstream port (`UPSTREAM_PORT`).
    pub port: u16,

    /// Accept self-signed upstream certificates.
    pub accept_invalid_certs: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "localhost".to_string(),
            port: 8060,
            accept_invalid_certs: false,
        }
    }
}

/// Outbound timeout classes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for ordinary relay calls in seconds.
    pub standard_secs: u64,

    /// Deadline for the approval calls in seconds.
    pub extended_secs: u64,
}

impl TimeoutConfig {
    pub fn standard(&self) -> Duration {
        Duration::from_secs(self.standard_secs)
    }

    pub fn extended(&self) -> Duration {
        Duration::from_secs(self.extended_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            standard_secs: 10,
            extended_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Base delay in milliseconds; the n-th retry waits `base * 2^n`.
    pub base_delay_ms: u64,

    /// Upper bound on a single backoff delay in milliseconds.
    pub max_delay_ms: u64,

    /// Inbound paths whose relay is wrapped in the retry loop.
    pub routes: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            routes: vec![
                "/admin/leave/approval".to_string(),
                "/api/leave/grant/approval".to_string(),
            ],
        }
    }
}

/// PostgreSQL connection settings (`PG*` variables).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    /// Pool size.
    pub max_connections: u32,

    /// How long a query waits for a pooled connection, in seconds.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
