//! Concrete line implementations.

#[cfg(feature = "rppal")]
pub mod rpi;
pub mod sim;
