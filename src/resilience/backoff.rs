//! Exponential backoff delays.

use std::time::Duration;

/// Calculate the delay before the next retry attempt.
///
/// `retry_index` is zero-based: the wait before the first retry uses
/// index 0. The delay doubles each retry (`base_ms * 2^retry_index`) and
/// is capped at `max_ms`. Saturating math so absurd indices cannot wrap.
pub fn calculate_backoff(retry_index: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exponential = 2u64.saturating_pow(retry_index);
    let delay_ms = base_ms.saturating_mul(exponential);
    Duration::from_millis(delay_ms.min(max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_retry() {
        assert_eq!(calculate_backoff(0, 500, 60_000), Duration::from_millis(500));
        assert_eq!(calculate_backoff(1, 500, 60_000), Duration::from_millis(1000));
        assert_eq!(calculate_backoff(2, 500, 60_000), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(calculate_backoff(10, 500, 2000), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_saturates_on_huge_index() {
        let d = calculate_backoff(u32::MAX, 500, 5000);
        assert_eq!(d, Duration::from_millis(5000));
    }
}
