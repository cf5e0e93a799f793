//! Error types for the ranging engine.

use thiserror::Error;

/// Errors surfaced by session start/stop and the trigger scheduler.
///
/// Per-cycle measurement anomalies are not errors; they are recorded in the
/// published [`Measurement`](crate::Measurement) itself.
#[derive(Debug, Error)]
pub enum RangingError {
    /// Rejected trigger configuration.
    #[error("invalid trigger config: {reason}")]
    InvalidConfig {
        /// What the validation rejected.
        reason: &'static str,
    },
    /// A GPIO collaborator could not drive, read or subscribe a line.
    #[error("gpio line fault: {source}")]
    Gpio {
        /// Error reported by the line implementation.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// An engine thread could not be spawned.
    #[error("failed to spawn {name} thread")]
    Spawn {
        /// Thread that failed to start.
        name: &'static str,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// An engine thread terminated abnormally and its resources are lost.
    #[error("{name} thread panicked")]
    ThreadPanicked {
        /// Thread that panicked.
        name: &'static str,
    },
}

impl RangingError {
    /// Wrap a line implementation's error.
    pub fn gpio<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RangingError::Gpio {
            source: Box::new(source),
        }
    }
}
