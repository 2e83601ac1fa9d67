//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value:?}")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then environment
/// overrides. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`. `lookup` abstracts the
/// environment so tests never mutate process state.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.listener.port = parse_port("PORT", port)?;
    }
    if let Some(host) = lookup("UPSTREAM_HOST") {
        config.upstream.host = host;
    }
    if let Some(port) = lookup("UPSTREAM_PORT") {
        config.upstream.port = parse_port("UPSTREAM_PORT", port)?;
    }
    if let Some(scheme) = lookup("UPSTREAM_SCHEME") {
        config.upstream.scheme = scheme;
    }

    if let Some(host) = lookup("PGHOST") {
        config.database.host = host;
    }
    if let Some(port) = lookup("PGPORT") {
        config.database.port = parse_port("PGPORT", port)?;
    }
    if let Some(user) = lookup("PGUSER") {
        config.database.user = user;
    }
    if let Some(password) = lookup("PGPASSWORD") {
        config.database.password = password;
    }
    if let Some(database) = lookup("PGDATABASE") {
        config.database.database = database;
    }

    Ok(())
}

fn parse_port(name: &'static str, value: String) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { name, value })
}
