//! The result of one trigger/echo cycle.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a measurement cycle concluded.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementStatus {
    /// A full echo pulse was captured and converted.
    Ok,
    /// The echo pulse width was zero or otherwise implausible.
    InvalidTiming,
    /// The configured number of trigger cycles passed without a completed echo.
    NoEcho,
    /// No cycle has completed since the session started.
    NotYetMeasured,
}

impl fmt::Display for MeasurementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementStatus::Ok => write!(f, "ok"),
            MeasurementStatus::InvalidTiming => write!(f, "invalid timing"),
            MeasurementStatus::NoEcho => write!(f, "no echo"),
            MeasurementStatus::NotYetMeasured => write!(f, "not yet measured"),
        }
    }
}

/// A single distance reading.
///
/// Each new cycle supersedes the previous reading; there is no history.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Distance to the target in whole centimeters; meaningful only when
    /// `status` is [`MeasurementStatus::Ok`].
    pub distance_cm: u32,
    /// How the cycle concluded.
    pub status: MeasurementStatus,
}

impl Measurement {
    /// A successful reading of `distance_cm` centimeters.
    pub const fn ok(distance_cm: u32) -> Self {
        Measurement {
            distance_cm,
            status: MeasurementStatus::Ok,
        }
    }

    /// A cycle whose echo pulse carried no usable timing.
    pub const fn invalid_timing() -> Self {
        Measurement {
            distance_cm: 0,
            status: MeasurementStatus::InvalidTiming,
        }
    }

    /// A cycle (or run of cycles) that produced no echo at all.
    pub const fn no_echo() -> Self {
        Measurement {
            distance_cm: 0,
            status: MeasurementStatus::NoEcho,
        }
    }

    /// The sentinel published before the first completed cycle.
    pub const fn not_yet_measured() -> Self {
        Measurement {
            distance_cm: 0,
            status: MeasurementStatus::NotYetMeasured,
        }
    }

    /// The distance, if this reading carries one.
    pub fn distance(&self) -> Option<u32> {
        match self.status {
            MeasurementStatus::Ok => Some(self.distance_cm),
            _ => None,
        }
    }
}

impl Default for Measurement {
    fn default() -> Self {
        Measurement::not_yet_measured()
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            MeasurementStatus::Ok => write!(f, "{} cm", self.distance_cm),
            status => write!(f, "{}", status),
        }
    }
}
