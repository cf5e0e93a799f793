//! Trigger cadence configuration.

use crate::error::RangingError;
use std::num::NonZeroU32;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default trigger pulse width for HC-SR04 class sensors.
pub const DEFAULT_PULSE_WIDTH: Duration = Duration::from_micros(10);
/// Default interval between trigger cycles.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);

/// Timing of the trigger cycle.
///
/// A session reads its config for its whole lifetime; changing the cadence
/// means stopping the session and starting a new one.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerConfig {
    /// How long the trigger line is held high per cycle.
    pub pulse_width: Duration,
    /// Interval between the start of consecutive trigger cycles.
    pub period: Duration,
    /// Publish a no-echo reading after this many consecutive cycles without
    /// a completed echo; `None` keeps the last completed reading standing.
    pub no_echo_after_cycles: Option<NonZeroU32>,
}

impl TriggerConfig {
    /// Construct a config with no no-echo watchdog.
    pub const fn new(pulse_width: Duration, period: Duration) -> Self {
        TriggerConfig {
            pulse_width,
            period,
            no_echo_after_cycles: None,
        }
    }

    /// Enable the no-echo watchdog at `cycles` consecutive echoless cycles.
    pub const fn with_no_echo_after(mut self, cycles: NonZeroU32) -> Self {
        self.no_echo_after_cycles = Some(cycles);
        self
    }

    /// Check the config for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`RangingError::InvalidConfig`] when the pulse width or period
    /// is zero, or when the period does not leave room for the pulse itself.
    pub fn validate(&self) -> Result<(), RangingError> {
        if self.pulse_width.is_zero() {
            return Err(RangingError::InvalidConfig {
                reason: "pulse width must be positive",
            });
        }
        if self.period.is_zero() {
            return Err(RangingError::InvalidConfig {
                reason: "period must be positive",
            });
        }
        if self.period <= self.pulse_width {
            return Err(RangingError::InvalidConfig {
                reason: "period must exceed pulse width",
            });
        }
        Ok(())
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        TriggerConfig::new(DEFAULT_PULSE_WIDTH, DEFAULT_PERIOD)
    }
}
