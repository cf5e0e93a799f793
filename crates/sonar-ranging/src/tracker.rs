//! Edge-timestamp tracking state machine.
//!
//! The tracker turns the echo line's level transitions into completed timing
//! windows. It is deliberately free of I/O and clocks: callers feed it edges
//! (and trigger firings) and act on the returned outcome. All mutation
//! happens from the single event-consuming context, so the machine needs no
//! internal locking.

use sonar_hal::Level;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

/// Phase of the echo capture for the current trigger cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoPhase {
    /// No pulse in flight.
    Idle,
    /// A trigger fired; the echo pulse has not started yet.
    AwaitingRisingEdge,
    /// The echo pulse started at `since`; waiting for it to end.
    AwaitingFallingEdge {
        /// When the open timing window began.
        since: Instant,
    },
}

/// What an edge did to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// A rising edge opened a fresh timing window.
    WindowOpened,
    /// A rising edge arrived while a window was already open; the stale
    /// window was discarded and a new one opened at the new timestamp.
    WindowRestarted,
    /// A falling edge closed the open window after this round-trip time.
    Completed(Duration),
    /// The edge carried no information in the current phase.
    Ignored,
}

/// What a trigger firing did to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The cycle is armed; nothing to report.
    Armed,
    /// The configured number of cycles elapsed without a completed echo.
    EchoOverdue,
}

/// State machine deriving timing windows from echo edges.
#[derive(Debug)]
pub struct EchoEdgeTracker {
    phase: EchoPhase,
    no_echo_after_cycles: Option<NonZeroU32>,
    cycles_without_echo: u32,
}

impl EchoEdgeTracker {
    /// Construct a tracker.
    ///
    /// With `no_echo_after_cycles` set, [`on_trigger_fired`](Self::on_trigger_fired)
    /// reports [`TriggerOutcome::EchoOverdue`] once that many consecutive
    /// cycles pass without a completed echo. Unset, lost echoes are silent
    /// and the last completed reading stands.
    pub fn new(no_echo_after_cycles: Option<NonZeroU32>) -> Self {
        EchoEdgeTracker {
            phase: EchoPhase::Idle,
            no_echo_after_cycles,
            cycles_without_echo: 0,
        }
    }

    /// Current phase of the state machine.
    pub fn phase(&self) -> EchoPhase {
        self.phase
    }

    /// Feed one echo line transition.
    ///
    /// `at` must come from the monotonic clock the line implementation
    /// stamps its edges with; the state, not the pin level, decides what the
    /// edge means.
    pub fn on_edge(&mut self, level: Level, at: Instant) -> EdgeOutcome {
        match (level, self.phase) {
            (Level::High, EchoPhase::Idle | EchoPhase::AwaitingRisingEdge) => {
                self.phase = EchoPhase::AwaitingFallingEdge { since: at };
                EdgeOutcome::WindowOpened
            }
            (Level::High, EchoPhase::AwaitingFallingEdge { .. }) => {
                // Spurious double rising edge: keep only the newer window.
                self.phase = EchoPhase::AwaitingFallingEdge { since: at };
                EdgeOutcome::WindowRestarted
            }
            (Level::Low, EchoPhase::AwaitingFallingEdge { since }) => {
                self.phase = EchoPhase::Idle;
                self.cycles_without_echo = 0;
                // A monotonic source cannot order `at` before `since`; map the
                // impossible to a zero width, which converts to InvalidTiming.
                let elapsed = at.checked_duration_since(since).unwrap_or(Duration::ZERO);
                EdgeOutcome::Completed(elapsed)
            }
            (Level::Low, EchoPhase::Idle | EchoPhase::AwaitingRisingEdge) => EdgeOutcome::Ignored,
        }
    }

    /// Note that the scheduler fired a trigger pulse.
    ///
    /// Arms the cycle when idle and drives the no-echo accounting. A window
    /// still open from an earlier cycle is left alone; the rising-edge guard
    /// in [`on_edge`](Self::on_edge) deals with it.
    pub fn on_trigger_fired(&mut self) -> TriggerOutcome {
        let previous_cycle_open = !matches!(self.phase, EchoPhase::Idle);
        if !previous_cycle_open {
            self.phase = EchoPhase::AwaitingRisingEdge;
        }

        let Some(limit) = self.no_echo_after_cycles else {
            return TriggerOutcome::Armed;
        };
        if previous_cycle_open {
            self.cycles_without_echo = self.cycles_without_echo.saturating_add(1);
        }
        if self.cycles_without_echo >= limit.get() {
            self.cycles_without_echo = 0;
            self.phase = EchoPhase::AwaitingRisingEdge;
            TriggerOutcome::EchoOverdue
        } else {
            TriggerOutcome::Armed
        }
    }
}
