#![warn(missing_docs)]
#![doc = "Ultrasonic time-of-flight ranging for HC-SR04 class sensors."]
#![doc = ""]
#![doc = "The crate turns a trigger/echo line pair into a steady stream of"]
#![doc = "distance readings: a scheduler fires short trigger pulses on a fixed"]
#![doc = "period, an edge tracker pairs the echo line's rising and falling"]
#![doc = "timestamps into round-trip times, and a lock-protected slot always"]
#![doc = "holds the latest reading for any number of consumers."]
#![doc = ""]
#![doc = "[`SensorSession`] wires all of it together over the line traits from"]
#![doc = "`sonar-hal`, so the same engine runs against real pins or the"]
#![doc = "bundled simulator."]

pub mod config;
pub mod distance;
pub mod error;
pub mod measurement;
pub mod publisher;
pub mod scheduler;
pub mod session;
pub mod tracker;

pub use config::TriggerConfig;
pub use error::RangingError;
pub use measurement::{Measurement, MeasurementStatus};
pub use publisher::MeasurementPublisher;
pub use scheduler::TriggerScheduler;
pub use session::{SensorSession, SessionStats};
pub use tracker::{EchoEdgeTracker, EchoPhase, EdgeOutcome, TriggerOutcome};
