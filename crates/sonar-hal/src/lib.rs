#![warn(missing_docs)]
#![doc = "Hardware abstraction for ultrasonic range sensing."]
#![doc = ""]
#![doc = "This crate defines the trigger/echo line capabilities and the monotonic clock"]
#![doc = "an ultrasonic driver runs against, together with a deterministic simulated"]
#![doc = "transducer and an optional Raspberry Pi GPIO backend."]

pub mod devices;
pub mod traits;

pub use traits::clock::{MonotonicClock, StdClock};
pub use traits::gpio::{EchoLine, EdgeHandler, Level, TriggerLine};
