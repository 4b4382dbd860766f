//! Common time helpers for heatmeter_core.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use heatmeter_traits::clock::Clock;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Granularity at which long waits re-check the stop flag.
pub const STOP_POLL: Duration = Duration::from_millis(100);

/// Sleep for `total` in `STOP_POLL` slices, returning early once `stop` is set.
/// Returns true when the full duration elapsed.
pub fn sleep_unless_stopped<C: Clock + ?Sized>(clock: &C, total: Duration, stop: &AtomicBool) -> bool {
    let mut left = total;
    while !left.is_zero() {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let slice = left.min(STOP_POLL);
        clock.sleep(slice);
        left = left.saturating_sub(slice);
    }
    !stop.load(Ordering::Relaxed)
}

/// Duration as whole milliseconds, saturating at `u64::MAX`.
#[inline]
pub fn as_millis_u64(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatmeter_traits::clock::test_clock::TestClock;

    #[test]
    fn sleeps_full_duration_when_not_stopped() {
        let clock = TestClock::new();
        let stop = AtomicBool::new(false);
        assert!(sleep_unless_stopped(&clock, Duration::from_millis(1_050), &stop));
        assert_eq!(clock.elapsed(), Duration::from_millis(1_050));
    }

    #[test]
    fn returns_immediately_when_stopped() {
        let clock = TestClock::new();
        let stop = AtomicBool::new(true);
        assert!(!sleep_unless_stopped(&clock, Duration::from_secs(15), &stop));
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn millis_saturate() {
        assert_eq!(as_millis_u64(Duration::from_secs(2)), 2 * MILLIS_PER_SEC);
        assert_eq!(as_millis_u64(Duration::MAX), u64::MAX);
    }
}
