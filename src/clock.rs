// Fixed-interval deadlines for the countdown and the recognition poller.
// Time is always passed in, so the whole game can be driven by a test clock.

use std::time::{Duration, Instant};

/// A self-rescheduling timer. It never fires on its own; the event loop asks
/// `due(now)` and the timer moves its deadline forward by one period per hit.
#[derive(Clone, Debug)]
pub struct Interval {
    period: Duration,
    next_due: Instant,
}

impl Interval {
    /// First hit one full period after `now`.
    pub fn starting(now: Instant, period: Duration) -> Self {
        Self { period, next_due: now + period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// True (and reschedules) once per elapsed period. Call in a loop to
    /// catch up after a stall; each call consumes at most one hit.
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.period;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_period() {
        let t0 = Instant::now();
        let mut iv = Interval::starting(t0, Duration::from_secs(1));
        assert!(!iv.due(t0));
        assert!(!iv.due(t0 + Duration::from_millis(999)));
        assert!(iv.due(t0 + Duration::from_secs(1)));
        assert!(!iv.due(t0 + Duration::from_millis(1500)));
    }

    #[test]
    fn catches_up_after_stall() {
        let t0 = Instant::now();
        let mut iv = Interval::starting(t0, Duration::from_secs(1));
        let late = t0 + Duration::from_millis(3200);
        let mut hits = 0;
        while iv.due(late) {
            hits += 1;
        }
        assert_eq!(hits, 3);
    }
}
