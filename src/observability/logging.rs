//! Structured logging.
//!
//! `tracing` events go to stdout through the fmt layer. `RUST_LOG` wins over
//! the configured level when set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

pub fn init_tracing(config: &ObservabilityConfig) {
    let default_filter = format!("leave_relay={level},tower_http={level}", level = config.log_level);

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer());

    if let Err(e) = registry.try_init() {
        eprintln!("tracing subscriber already installed: {e}");
    }
}
