//! Capability traits an ultrasonic ranging engine is written against.

pub mod clock;
pub mod gpio;
