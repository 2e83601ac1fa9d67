//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and that the retry
//! route set only names routes the relay actually serves. All errors are
//! collected, not just the first.

use std::fmt;

use crate::config::schema::ProxyConfig;
use crate::routing::table::find_route;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.upstream.host.trim().is_empty() {
        errors.push(ValidationError::new("upstream.host", "must not be empty"));
    }
    if config.upstream.port == 0 {
        errors.push(ValidationError::new("upstream.port", "must be non-zero"));
    }
    if !matches!(config.upstream.scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::new(
            "upstream.scheme",
            format!("unsupported scheme {:?}", config.upstream.scheme),
        ));
    }

    if config.timeouts.standard_secs == 0 {
        errors.push(ValidationError::new("timeouts.standard_secs", "must be greater than 0"));
    }
    if config.timeouts.extended_secs == 0 {
        errors.push(ValidationError::new("timeouts.extended_secs", "must be greater than 0"));
    }

    if config.retries.max_delay_ms < config.retries.base_delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            "must not be smaller than retries.base_delay_ms",
        ));
    }
    for path in &config.retries.routes {
        if find_route(path).is_none() {
            errors.push(ValidationError::new(
                "retries.routes",
                format!("unknown route {path}"),
            ));
        }
    }

    if config.database.max_connections == 0 {
        errors.push(ValidationError::new("database.max_connections", "must be greater than 0"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = ProxyConfig::default();
        config.upstream.scheme = "ftp".to_string();
        config.timeouts.standard_secs = 0;
        config.retries.routes.push("/api/nope".to_string());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["upstream.scheme", "timeouts.standard_secs", "retries.routes"]
        );
        assert_eq!(errors[2].to_string(), "retries.routes: unknown route /api/nope");
    }

    #[test]
    fn any_served_route_may_be_retried() {
        let mut config = ProxyConfig::default();
        config.retries.routes.push("/api/user/password/reset".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
