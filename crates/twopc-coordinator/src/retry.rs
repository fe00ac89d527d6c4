//! Exponential backoff for outbound Prepare/Commit calls (spec §4.3 "Retry
//! with backoff": `base_delay * 2^attempt`), grounded on the teacher's
//! `RetryPolicy::delay_for_attempt` but trimmed to the one strategy the
//! spec asks for.

use std::time::Duration;

/// Delay before retry attempt `attempt` (1-indexed: the delay before the
/// *second* try is `delay_for_attempt(1)`).
pub fn delay_for_attempt(base_delay: Duration, attempt: u32) -> Duration {
    let exp = 2_u32.saturating_pow(attempt);
    base_delay.saturating_mul(exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_each_attempt() {
        let base = Duration::from_millis(100);
        assert_eq!(delay_for_attempt(base, 0), Duration::from_millis(100));
        assert_eq!(delay_for_attempt(base, 1), Duration::from_millis(200));
        assert_eq!(delay_for_attempt(base, 2), Duration::from_millis(400));
    }
}
