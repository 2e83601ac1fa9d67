//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Relay to upstream:
//!     → timeouts.rs (every outbound call has a deadline)
//!     → on transport failure, for retried routes only:
//!         retries.rs (retry loop) → backoff.rs (2s, 4s, 8s)
//! ```
//!
//! An HTTP response of any status ends the retry loop. Only failures to get
//! a response at all are retried.

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{retry_with_backoff, RetryExhausted, RetryPolicy};
pub use timeouts::{with_deadline, DeadlineExceeded};
