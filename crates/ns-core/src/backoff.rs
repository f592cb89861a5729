use std::time::Duration;

/// Exponential backoff used by the retry orchestrator.
///
/// `attempt_number` is the 1-based attempt that just failed:
/// Attempt 1 failed: base
/// Attempt 2 failed: 2 * base
/// Attempt n failed: base * 2^(n-1), never above `max`
pub fn exponential_backoff(attempt_number: u32, base: Duration, max: Duration) -> Duration {
    let exp = attempt_number.saturating_sub(1).min(31);
    let factor = 1u32 << exp;
    base.checked_mul(factor).unwrap_or(max).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_cap() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(8);
        assert_eq!(exponential_backoff(1, base, max), Duration::from_millis(500));
        assert_eq!(exponential_backoff(2, base, max), Duration::from_secs(1));
        assert_eq!(exponential_backoff(3, base, max), Duration::from_secs(2));
        assert_eq!(exponential_backoff(5, base, max), Duration::from_secs(8));
        assert_eq!(exponential_backoff(6, base, max), Duration::from_secs(8));
    }

    #[test]
    fn attempt_zero_is_treated_as_first() {
        let base = Duration::from_millis(100);
        assert_eq!(exponential_backoff(0, base, Duration::from_secs(1)), base);
    }

    #[test]
    fn huge_attempt_numbers_saturate_at_cap() {
        let max = Duration::from_secs(30);
        assert_eq!(exponential_backoff(u32::MAX, Duration::from_secs(1), max), max);
    }
}
