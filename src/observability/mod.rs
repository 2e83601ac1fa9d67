//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and the relay produce:
//!     → logging.rs (structured tracing events, request id in the span)
//!     → metrics.rs (counters, histograms)
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
