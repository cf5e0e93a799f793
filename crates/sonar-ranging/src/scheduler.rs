//! Fixed-cadence trigger pulse scheduling.

use crate::config::TriggerConfig;
use crate::error::RangingError;
use sonar_hal::{MonotonicClock, TriggerLine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Granularity at which a running scheduler rechecks its cancel flag.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Emits trigger pulses at a fixed period, echo or no echo.
///
/// Each completed tick re-arms the next one at `now + period`, so a delayed
/// tick shifts the cadence instead of stacking catch-up pulses, and a tick
/// whose pulse fails is skipped without disturbing the cadence.
pub struct TriggerScheduler<T, C> {
    line: T,
    clock: C,
    config: TriggerConfig,
}

impl<T, C> TriggerScheduler<T, C>
where
    T: TriggerLine,
    C: MonotonicClock,
{
    /// Construct a scheduler around a trigger line and a clock.
    ///
    /// # Errors
    ///
    /// Returns [`RangingError::InvalidConfig`] for a config the cadence
    /// cannot run with.
    pub fn new(line: T, clock: C, config: TriggerConfig) -> Result<Self, RangingError> {
        config.validate()?;
        Ok(TriggerScheduler { line, clock, config })
    }

    /// The configured cadence.
    pub fn config(&self) -> TriggerConfig {
        self.config
    }

    /// Fire one trigger pulse: drive the line high, hold it for the pulse
    /// width, drive it low.
    ///
    /// # Errors
    ///
    /// Returns [`RangingError::Gpio`] when the line cannot be driven; the
    /// pulse is abandoned but the scheduler remains usable.
    pub fn tick(&mut self) -> Result<(), RangingError> {
        self.line.set_high().map_err(RangingError::gpio)?;
        self.clock.sleep(self.config.pulse_width);
        self.line.set_low().map_err(RangingError::gpio)?;
        Ok(())
    }

    /// Tick until `cancel` becomes true, reporting each tick's outcome.
    ///
    /// The next tick is armed from the clock reading taken after the current
    /// one finishes. Cancellation is honored within
    /// [`CANCEL_POLL_INTERVAL`] even mid-period.
    pub fn run<F>(&mut self, cancel: &AtomicBool, mut after_tick: F)
    where
        F: FnMut(Result<(), RangingError>),
    {
        while !cancel.load(Ordering::SeqCst) {
            after_tick(self.tick());
            let deadline = self.clock.now() + self.config.period;
            loop {
                if cancel.load(Ordering::SeqCst) {
                    return;
                }
                let now = self.clock.now();
                if now >= deadline {
                    break;
                }
                self.clock.sleep((deadline - now).min(CANCEL_POLL_INTERVAL));
            }
        }
    }

    /// Give the trigger line back, consuming the scheduler.
    pub fn into_line(self) -> T {
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::fmt;
    use std::rc::Rc;
    use std::time::Instant;

    /// Virtual clock: sleeping advances time instead of blocking.
    #[derive(Clone)]
    struct FakeClock {
        base: Instant,
        offset: Rc<Cell<Duration>>,
    }

    impl FakeClock {
        fn new() -> Self {
            FakeClock {
                base: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
            }
        }
    }

    impl MonotonicClock for FakeClock {
        fn now(&self) -> Instant {
            self.base + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.offset.set(self.offset.get() + duration);
        }
    }

    #[derive(Debug, PartialEq)]
    struct FakeLineError;

    impl fmt::Display for FakeLineError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake line refused")
        }
    }

    impl std::error::Error for FakeLineError {}

    /// Records every level change with the virtual time it happened at.
    struct FakeLine {
        log: Rc<RefCell<Vec<(bool, Duration)>>>,
        offset: Rc<Cell<Duration>>,
        fail_on_highs: Vec<usize>,
        highs_attempted: usize,
    }

    impl TriggerLine for FakeLine {
        type Error = FakeLineError;

        fn set_high(&mut self) -> Result<(), FakeLineError> {
            self.highs_attempted += 1;
            if self.fail_on_highs.contains(&self.highs_attempted) {
                return Err(FakeLineError);
            }
            self.log.borrow_mut().push((true, self.offset.get()));
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), FakeLineError> {
            self.log.borrow_mut().push((false, self.offset.get()));
            Ok(())
        }
    }

    fn harness(fail_on_highs: Vec<usize>) -> (TriggerScheduler<FakeLine, FakeClock>, Rc<RefCell<Vec<(bool, Duration)>>>) {
        let clock = FakeClock::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let line = FakeLine {
            log: Rc::clone(&log),
            offset: Rc::clone(&clock.offset),
            fail_on_highs,
            highs_attempted: 0,
        };
        let config = TriggerConfig::default(); // 10 us pulse, 100 ms period
        let scheduler = TriggerScheduler::new(line, clock, config).unwrap();
        (scheduler, log)
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let clock = FakeClock::new();
        let line = FakeLine {
            log: Rc::new(RefCell::new(Vec::new())),
            offset: Rc::clone(&clock.offset),
            fail_on_highs: Vec::new(),
            highs_attempted: 0,
        };
        let config = TriggerConfig::new(Duration::ZERO, Duration::from_millis(100));
        assert!(matches!(
            TriggerScheduler::new(line, clock, config),
            Err(RangingError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn tick_shapes_one_pulse() {
        let (mut scheduler, log) = harness(Vec::new());
        scheduler.tick().unwrap();

        let log = log.borrow();
        // High at t=0, low after exactly the 10 us pulse width.
        assert_eq!(log.as_slice(), &[
            (true, Duration::ZERO),
            (false, Duration::from_micros(10)),
        ]);
    }

    #[test]
    fn run_fires_on_the_period() {
        let (mut scheduler, log) = harness(Vec::new());
        let cancel = AtomicBool::new(false);
        let mut ticks = 0;
        scheduler.run(&cancel, |outcome| {
            assert!(outcome.is_ok());
            ticks += 1;
            if ticks == 4 {
                cancel.store(true, Ordering::SeqCst);
            }
        });

        let log = log.borrow();
        let rising: Vec<Duration> = log.iter().filter(|(high, _)| *high).map(|(_, at)| *at).collect();
        assert_eq!(rising.len(), 4);
        // Pulses land at 0, 100, 200, 300 ms, each shifted only by the
        // pulse widths already spent (10 us per earlier cycle).
        for (cycle, at) in rising.iter().enumerate() {
            let nominal = Duration::from_millis(100 * cycle as u64);
            assert!(*at >= nominal, "cycle {} fired early: {:?}", cycle, at);
            assert!(*at < nominal + Duration::from_millis(1), "cycle {} fired late: {:?}", cycle, at);
        }
    }

    #[test]
    fn failed_pulse_skips_the_cycle_but_not_the_cadence() {
        let (mut scheduler, log) = harness(vec![2]);
        let cancel = AtomicBool::new(false);
        let mut outcomes = Vec::new();
        scheduler.run(&cancel, |outcome| {
            outcomes.push(outcome.is_ok());
            if outcomes.len() == 3 {
                cancel.store(true, Ordering::SeqCst);
            }
        });

        assert_eq!(outcomes, vec![true, false, true]);
        let log = log.borrow();
        let rising: Vec<Duration> = log.iter().filter(|(high, _)| *high).map(|(_, at)| *at).collect();
        // The second cycle left no pulse; the third still fired on schedule.
        assert_eq!(rising.len(), 2);
        assert!(rising[1] >= Duration::from_millis(200));
        assert!(rising[1] < Duration::from_millis(201));
    }

    #[test]
    fn cancel_before_first_tick_fires_nothing() {
        let (mut scheduler, log) = harness(Vec::new());
        let cancel = AtomicBool::new(true);
        scheduler.run(&cancel, |_| panic!("tick after cancel"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn into_line_returns_the_line() {
        let (scheduler, _log) = harness(Vec::new());
        let line = scheduler.into_line();
        assert_eq!(line.highs_attempted, 0);
    }
}
