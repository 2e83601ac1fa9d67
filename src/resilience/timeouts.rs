//! Deadline enforcement for outbound calls.
//!
//! The wrapped future is dropped when the deadline passes. For an HTTP
//! exchange that drops the in-flight connection, so the socket is closed
//! rather than returned to the pool.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no response within {}ms", .0.as_millis())]
pub struct DeadlineExceeded(pub Duration);

pub async fn with_deadline<F>(deadline: Duration, future: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| DeadlineExceeded(deadline))
}
