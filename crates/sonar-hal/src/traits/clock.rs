//! Monotonic time source with sub-millisecond sleeping.

use spin_sleep::SpinSleeper;
use std::time::{Duration, Instant};

/// Monotonic clock a ranging engine schedules against.
///
/// Pulse widths are in the tens of microseconds, so `sleep` must be precise
/// well below a millisecond. Implementations must never consult wall-clock
/// time.
pub trait MonotonicClock {
    /// Current instant on the monotonic clock.
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Block the calling thread until `deadline`; returns immediately if the
    /// deadline has already passed.
    fn sleep_until(&self, deadline: Instant) {
        if let Some(remaining) = deadline.checked_duration_since(self.now()) {
            self.sleep(remaining);
        }
    }
}

/// [`MonotonicClock`] backed by [`std::time::Instant`] and a spin sleeper.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    sleeper: SpinSleeper,
}

impl StdClock {
    /// Construct a clock whose sleeper trusts the OS down to 10 µs and spins
    /// for the remainder.
    pub fn new() -> Self {
        StdClock {
            sleeper: SpinSleeper::new(10_000),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        StdClock::new()
    }
}

impl MonotonicClock for StdClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeper.sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_lasts_at_least_the_requested_duration() {
        let clock = StdClock::new();
        let requested = Duration::from_micros(500);
        let before = clock.now();
        clock.sleep(requested);
        assert!(clock.now() - before >= requested);
    }

    #[test]
    fn sleep_until_past_deadline_returns_immediately() {
        let clock = StdClock::new();
        let past = clock.now() - Duration::from_millis(10);
        let before = Instant::now();
        clock.sleep_until(past);
        // Anything well under the 10 ms the deadline lay in the past.
        assert!(before.elapsed() < Duration::from_millis(5));
    }
}
