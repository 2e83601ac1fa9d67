//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init tracing/metrics → Build server → Bind
//!
//! Shutdown:
//!     SIGINT/SIGTERM (signals.rs) → Shutdown::trigger (shutdown.rs)
//!     → server stops accepting, drains in-flight requests → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_signal;
