//! Turns a distance reading into a tank fill level.
//!
//! The sensor looks down at the liquid surface, so the measured distance is
//! the empty headroom: a full tank reads near zero, an empty one reads the
//! tank depth.

/// Percentage of the tank that is full, clamped to 0..=100.
///
/// A reading beyond the tank depth means the surface is below the floor the
/// gauge was calibrated for and counts as empty.
pub fn fill_percent(depth_cm: u32, distance_cm: u32) -> u8 {
    if depth_cm == 0 {
        return 0;
    }
    let filled = depth_cm.saturating_sub(distance_cm);
    (u64::from(filled) * 100 / u64::from(depth_cm)) as u8
}
