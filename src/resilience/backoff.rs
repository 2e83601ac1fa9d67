//! Exponential backoff.

use std::time::Duration;

/// Delay before the next attempt once `failures` attempts have failed.
///
/// `base_ms * 2^failures`, capped at `max_ms`. With a 1s base this yields
/// 2s, 4s, 8s for the first three retries. No jitter is applied.
pub fn calculate_backoff(failures: u32, base_ms: u64, max_ms: u64) -> Duration {
    if failures == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(failures);
    let delay_ms = base_ms.saturating_mul(exponential_base);

    Duration::from_millis(delay_ms.min(max_ms))
}
