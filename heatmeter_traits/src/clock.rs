use std::thread;
use std::time::{Duration, Instant, SystemTime};

/// Clock abstraction for deadlines, backoff and sample timestamps.
///
/// - now(): returns a monotonic Instant (deadlines, elapsed time)
/// - wall(): returns wall-clock time (snapshot timestamps)
/// - sleep(): sleeps for the provided duration (implementations may simulate)
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    fn wall(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic test clock whose time can be advanced manually.
    ///
    /// now() = origin + offset, wall() = wall_origin + offset
    /// sleep(d) advances internal time by d without actually sleeping.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        wall_origin: SystemTime,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                // 2024-01-01T00:00:00Z keeps timestamps stable across runs
                wall_origin: SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Current offset relative to origin.
        pub fn elapsed(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn wall(&self) -> SystemTime {
            self.wall_origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn sleep_advances_both_timelines() {
            let clock = TestClock::new();
            let t0 = clock.now();
            let w0 = clock.wall();
            clock.sleep(Duration::from_secs(3));
            assert_eq!(clock.now() - t0, Duration::from_secs(3));
            assert_eq!(
                clock.wall().duration_since(w0).unwrap_or_default(),
                Duration::from_secs(3)
            );
        }

        #[test]
        fn clones_share_time() {
            let a = TestClock::new();
            let b = a.clone();
            a.advance(Duration::from_millis(250));
            assert_eq!(b.elapsed(), Duration::from_millis(250));
            b.sleep(Duration::from_millis(10));
            assert_eq!(a.elapsed(), Duration::from_millis(260));
        }
    }
}
