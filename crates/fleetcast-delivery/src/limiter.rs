//! Outbound rate limiting
//!
//! A single-token limiter: every delivery attempt must pass through
//! [`RateLimiter::acquire`], which suspends the calling context for the full
//! configured spacing between consecutive attempts. The wait is wall-clock
//! and not adjusted for the previous attempt's latency, matching the source
//! system's fixed inter-send sleep.
//!
//! The clock is injectable so tests can observe the waits without sleeping.

use std::time::Duration;

/// Time source used by the limiter
pub trait Clock {
    /// Suspend the calling context for `duration`.
    fn sleep(&self, duration: Duration);
}

/// The real wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Enforces a minimum spacing between the starts of consecutive attempts.
///
/// The first acquisition passes immediately; every later one sleeps the full
/// configured interval first.
#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    min_interval: Duration,
    attempted: bool,
    clock: C,
}

impl RateLimiter<SystemClock> {
    /// Limiter over the real wall clock.
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Limiter over an injected clock.
    pub fn with_clock(min_interval: Duration, clock: C) -> Self {
        Self {
            min_interval,
            attempted: false,
            clock,
        }
    }

    /// Configured minimum spacing
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until the next attempt may start.
    pub fn acquire(&mut self) {
        if self.attempted {
            self.clock.sleep(self.min_interval);
        }
        self.attempted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records requested sleeps instead of performing them.
    #[derive(Clone, Default)]
    struct ManualClock {
        sleeps: Rc<RefCell<Vec<Duration>>>,
    }

    impl Clock for ManualClock {
        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    #[test]
    fn test_first_acquire_does_not_sleep() {
        let clock = ManualClock::default();
        let mut limiter = RateLimiter::with_clock(Duration::from_secs(60), clock.clone());

        limiter.acquire();
        assert!(clock.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_subsequent_acquires_sleep_full_interval() {
        let clock = ManualClock::default();
        let mut limiter = RateLimiter::with_clock(Duration::from_secs(60), clock.clone());

        for _ in 0..4 {
            limiter.acquire();
        }

        let sleeps = clock.sleeps.borrow();
        assert_eq!(sleeps.len(), 3);
        assert!(sleeps.iter().all(|d| *d == Duration::from_secs(60)));
    }

    #[test]
    fn test_wall_clock_spacing() {
        let mut limiter = RateLimiter::new(Duration::from_millis(25));
        let start = std::time::Instant::now();
        for _ in 0..3 {
            limiter.acquire();
        }
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
