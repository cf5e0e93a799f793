//! One running sensor: trigger cadence in, readings out.
//!
//! A session owns the two GPIO lines and two named threads. The trigger
//! thread runs the [`TriggerScheduler`]; the event thread is the single
//! consumer of a bounded channel fed by the echo line's edge handler and by
//! the trigger thread, and is the only context that touches the
//! [`EchoEdgeTracker`] or writes the published slot. Line callbacks do
//! nothing but a non-blocking send, so the time-critical notification
//! context never stalls and never allocates.

use crate::config::TriggerConfig;
use crate::distance;
use crate::error::RangingError;
use crate::measurement::Measurement;
use crate::publisher::MeasurementPublisher;
use crate::scheduler::TriggerScheduler;
use crate::tracker::{EchoEdgeTracker, EdgeOutcome, TriggerOutcome};
use sonar_hal::{EchoLine, Level, StdClock, TriggerLine};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{info, trace, warn};
use uuid::Uuid;

const TRIGGER_THREAD: &str = "sonar-trigger";
const EVENT_THREAD: &str = "sonar-events";

/// Edge events queue up here while the consumer is busy; at one trigger
/// cycle per entry this is minutes of backlog.
const EVENT_QUEUE_DEPTH: usize = 64;

enum SessionEvent {
    Edge { level: Level, at: Instant },
    TriggerFired,
}

/// Counters accumulated over a session's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Trigger pulses fired.
    pub ticks_fired: u64,
    /// Trigger pulses skipped because the line could not be driven.
    pub ticks_skipped: u64,
    /// Measurements published, no-echo reports included.
    pub measurements_published: u64,
    /// Timing windows discarded by the duplicate-rising-edge guard.
    pub windows_discarded: u64,
    /// Events dropped because the edge queue was full.
    pub events_dropped: u64,
    /// No-echo reports published by the watchdog.
    pub echo_timeouts: u64,
}

#[derive(Default)]
struct SessionCounters {
    ticks_fired: AtomicU64,
    ticks_skipped: AtomicU64,
    windows_discarded: AtomicU64,
    events_dropped: AtomicU64,
    echo_timeouts: AtomicU64,
}

impl SessionCounters {
    fn snapshot(&self) -> SessionStats {
        SessionStats {
            ticks_fired: self.ticks_fired.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            measurements_published: 0,
            windows_discarded: self.windows_discarded.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            echo_timeouts: self.echo_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// A running measurement session over one trigger/echo line pair.
pub struct SensorSession<T, E>
where
    E: EchoLine,
{
    id: Uuid,
    config: TriggerConfig,
    publisher: MeasurementPublisher,
    counters: Arc<SessionCounters>,
    stop_flag: Arc<AtomicBool>,
    echo: Option<E>,
    trigger_thread: Option<JoinHandle<T>>,
    event_thread: Option<JoinHandle<()>>,
}

impl<T, E> SensorSession<T, E>
where
    T: TriggerLine + Send + 'static,
    E: EchoLine,
{
    /// Take ownership of the lines and start measuring.
    ///
    /// The trigger line is driven low first so the sensor sees a defined
    /// idle level, and a warning is logged if the echo line is already high.
    ///
    /// # Errors
    ///
    /// Fails on an invalid `config`, when either line reports a fault while
    /// being wired up, or when a thread cannot be spawned. The lines are
    /// dropped on failure.
    pub fn start(mut trigger: T, mut echo: E, config: TriggerConfig) -> Result<Self, RangingError> {
        config.validate()?;
        let id = Uuid::new_v4();

        trigger.set_low().map_err(RangingError::gpio)?;
        if echo.read_level().map_err(RangingError::gpio)? == Level::High {
            warn!(session = %id, "echo line already high at session start");
        }

        let mut scheduler = TriggerScheduler::new(trigger, StdClock::new(), config)?;
        let publisher = MeasurementPublisher::new();
        let counters = Arc::new(SessionCounters::default());
        let stop_flag = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = mpsc::sync_channel::<SessionEvent>(EVENT_QUEUE_DEPTH);

        let event_thread = {
            let tracker = EchoEdgeTracker::new(config.no_echo_after_cycles);
            let publisher = publisher.clone();
            let counters = Arc::clone(&counters);
            thread::Builder::new()
                .name(EVENT_THREAD.into())
                .spawn(move || consume_events(tracker, publisher, counters, events_rx))
                .map_err(|source| RangingError::Spawn { name: EVENT_THREAD, source })?
        };

        {
            let tx = events_tx.clone();
            let counters = Arc::clone(&counters);
            echo.set_edge_handler(Box::new(move |level, at| {
                if tx.try_send(SessionEvent::Edge { level, at }).is_err() {
                    counters.events_dropped.fetch_add(1, Ordering::Relaxed);
                }
            }))
            .map_err(RangingError::gpio)?;
        }

        let trigger_thread = {
            let tx = events_tx;
            let counters = Arc::clone(&counters);
            let stop_flag = Arc::clone(&stop_flag);
            let builder = thread::Builder::new().name(TRIGGER_THREAD.into());
            let spawned = builder.spawn(move || {
                scheduler.run(&stop_flag, |outcome| match outcome {
                    Ok(()) => {
                        counters.ticks_fired.fetch_add(1, Ordering::Relaxed);
                        if tx.try_send(SessionEvent::TriggerFired).is_err() {
                            counters.events_dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(error) => {
                        counters.ticks_skipped.fetch_add(1, Ordering::Relaxed);
                        warn!(%error, "trigger pulse skipped");
                    }
                });
                scheduler.into_line()
            });
            match spawned {
                Ok(handle) => handle,
                Err(source) => {
                    let _ = echo.clear_edge_handler();
                    return Err(RangingError::Spawn { name: TRIGGER_THREAD, source });
                }
            }
        };

        info!(
            session = %id,
            period_ms = config.period.as_millis() as u64,
            pulse_us = config.pulse_width.as_micros() as u64,
            "ranging session started"
        );
        Ok(SensorSession {
            id,
            config,
            publisher,
            counters,
            stop_flag,
            echo: Some(echo),
            trigger_thread: Some(trigger_thread),
            event_thread: Some(event_thread),
        })
    }

    /// The most recently published reading.
    pub fn read(&self) -> Measurement {
        self.publisher.current()
    }

    /// Counters snapshot for this session.
    pub fn stats(&self) -> SessionStats {
        let mut stats = self.counters.snapshot();
        stats.measurements_published = self.publisher.publish_count();
        stats
    }

    /// Identifier this session logs under.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The cadence this session runs at.
    pub fn config(&self) -> TriggerConfig {
        self.config
    }

    /// Stop measuring and hand the lines back for reuse.
    ///
    /// Detaches the edge handler, then joins both threads. Once this
    /// returns, no further publish can occur: the line no longer notifies
    /// anyone, and the contexts that wrote the slot have exited.
    ///
    /// # Errors
    ///
    /// Returns [`RangingError::Gpio`] if the handler cannot be detached and
    /// [`RangingError::ThreadPanicked`] if a thread died; the remaining
    /// teardown then happens on drop, best effort.
    pub fn stop(mut self) -> Result<(T, E), RangingError> {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(echo) = self.echo.as_mut() {
            echo.clear_edge_handler().map_err(RangingError::gpio)?;
        }

        let Some(trigger_handle) = self.trigger_thread.take() else {
            return Err(RangingError::ThreadPanicked { name: TRIGGER_THREAD });
        };
        let trigger = trigger_handle
            .join()
            .map_err(|_| RangingError::ThreadPanicked { name: TRIGGER_THREAD })?;

        // Both senders are gone now, so the consumer drains and exits.
        if let Some(event_handle) = self.event_thread.take() {
            event_handle
                .join()
                .map_err(|_| RangingError::ThreadPanicked { name: EVENT_THREAD })?;
        }

        let Some(echo) = self.echo.take() else {
            return Err(RangingError::ThreadPanicked { name: EVENT_THREAD });
        };

        info!(session = %self.id, stats = ?self.stats(), "ranging session stopped");
        Ok((trigger, echo))
    }
}

impl<T, E> Drop for SensorSession<T, E>
where
    E: EchoLine,
{
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        let detached = match self.echo.as_mut() {
            Some(echo) => echo.clear_edge_handler().is_ok(),
            None => true,
        };
        if let Some(handle) = self.trigger_thread.take() {
            let _ = handle.join();
        }
        // With the handler still attached the event channel cannot
        // disconnect; joining would hang, so that thread is left to exit
        // on its own.
        if detached {
            if let Some(handle) = self.event_thread.take() {
                let _ = handle.join();
            }
        }
    }
}

/// Single consumer of the session's event channel. Exits when every sender
/// is gone.
fn consume_events(
    mut tracker: EchoEdgeTracker,
    publisher: MeasurementPublisher,
    counters: Arc<SessionCounters>,
    events: mpsc::Receiver<SessionEvent>,
) {
    while let Ok(event) = events.recv() {
        match event {
            SessionEvent::Edge { level, at } => match tracker.on_edge(level, at) {
                EdgeOutcome::Completed(elapsed) => {
                    let measurement = distance::from_round_trip(elapsed);
                    publisher.publish(measurement);
                    trace!(elapsed_us = elapsed.as_micros() as u64, %measurement, "cycle completed");
                }
                EdgeOutcome::WindowRestarted => {
                    counters.windows_discarded.fetch_add(1, Ordering::Relaxed);
                    trace!("duplicate rising edge, window restarted");
                }
                EdgeOutcome::WindowOpened | EdgeOutcome::Ignored => {}
            },
            SessionEvent::TriggerFired => {
                if let TriggerOutcome::EchoOverdue = tracker.on_trigger_fired() {
                    counters.echo_timeouts.fetch_add(1, Ordering::Relaxed);
                    publisher.publish(Measurement::no_echo());
                    trace!("echo overdue, published no-echo");
                }
            }
        }
    }
}
