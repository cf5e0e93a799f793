//! Elapsed round-trip time to distance conversion.

use crate::measurement::Measurement;
use std::time::Duration;

/// Round-trip microseconds per centimeter of target distance.
///
/// Sound covers one centimeter out and one centimeter back in roughly 58 µs
/// at 343 m/s, the figure the HC-SR04 datasheet builds on.
pub const ROUND_TRIP_US_PER_CM: u64 = 58;

/// Convert a measured echo pulse width into a distance reading.
///
/// A zero elapsed time cannot come from a real echo and yields
/// [`MeasurementStatus::InvalidTiming`](crate::MeasurementStatus::InvalidTiming);
/// anything else divides down to whole centimeters, rounding toward zero.
pub fn from_round_trip(elapsed: Duration) -> Measurement {
    if elapsed.is_zero() {
        return Measurement::invalid_timing();
    }
    let distance = elapsed.as_micros() / u128::from(ROUND_TRIP_US_PER_CM);
    Measurement::ok(distance.min(u128::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::MeasurementStatus;

    #[test]
    fn zero_elapsed_is_invalid_timing() {
        assert_eq!(from_round_trip(Duration::ZERO), Measurement::invalid_timing());
    }

    #[test]
    fn conversion_rounds_toward_zero() {
        // 1160 / 58 = 20 exactly
        assert_eq!(from_round_trip(Duration::from_micros(1160)), Measurement::ok(20));
        // 57 / 58 = 0 (a real edge pair closer than 1 cm)
        assert_eq!(from_round_trip(Duration::from_micros(57)), Measurement::ok(0));
        // 58 / 58 = 1
        assert_eq!(from_round_trip(Duration::from_micros(58)), Measurement::ok(1));
        // 1217 / 58 = 20.98.. -> 20
        assert_eq!(from_round_trip(Duration::from_micros(1217)), Measurement::ok(20));
    }

    #[test]
    fn sub_microsecond_elapsed_is_still_a_reading() {
        // Non-zero but under a microsecond: 0 whole centimeters, status Ok.
        let m = from_round_trip(Duration::from_nanos(500));
        assert_eq!(m.status, MeasurementStatus::Ok);
        assert_eq!(m.distance_cm, 0);
    }

    #[test]
    fn absurd_elapsed_saturates_instead_of_wrapping() {
        // ~8 years of echo; the division exceeds u32 and must clamp.
        let m = from_round_trip(Duration::from_secs(250_000_000));
        assert_eq!(m.distance_cm, u32::MAX);
        assert_eq!(m.status, MeasurementStatus::Ok);
    }
}
