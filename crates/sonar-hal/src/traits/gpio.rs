//! GPIO line capabilities for an HC-SR04 class sensor.
//!
//! A ranging engine needs exactly two lines: an output it can pulse (the
//! trigger) and an input whose level transitions it can observe with
//! timestamps (the echo). The traits here describe those two capabilities
//! without naming a GPIO backend.

use std::time::Instant;

/// Logical level of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Line driven or read low.
    Low,
    /// Line driven or read high.
    High,
}

/// Callback invoked on every echo line transition.
///
/// The level is the level the line changed **to**; the instant is captured as
/// close to the transition as the backend allows and comes from the same
/// monotonic clock as [`std::time::Instant`].
pub type EdgeHandler = Box<dyn FnMut(Level, Instant) + Send + 'static>;

/// Capability to drive the sensor's trigger line.
pub trait TriggerLine {
    /// Error produced when the line cannot be driven.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Drive the line high.
    fn set_high(&mut self) -> Result<(), Self::Error>;

    /// Drive the line low.
    fn set_low(&mut self) -> Result<(), Self::Error>;
}

/// Capability to observe the sensor's echo line.
pub trait EchoLine {
    /// Error produced when the line cannot be read or subscribed.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the current level of the line.
    fn read_level(&self) -> Result<Level, Self::Error>;

    /// Register a handler invoked on every rising and falling edge.
    ///
    /// Installing a new handler replaces any previous one. The handler runs
    /// in the backend's notification context and must not block.
    fn set_edge_handler(&mut self, handler: EdgeHandler) -> Result<(), Self::Error>;

    /// Remove the current edge handler.
    ///
    /// Once this returns, the handler is guaranteed not to be invoked again.
    fn clear_edge_handler(&mut self) -> Result<(), Self::Error>;
}
