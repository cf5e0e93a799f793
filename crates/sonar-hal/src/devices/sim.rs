//! In-process simulated HC-SR04 transducer.
//!
//! The simulator answers every completed trigger pulse with an echo pulse
//! whose width encodes a configurable target distance, delivered through the
//! same edge-handler interface a hardware backend would use and with
//! timestamps captured at the simulated transitions. A target of `None`
//! keeps the echo line silent, and trigger faults can be injected to
//! exercise failure paths.

use crate::traits::gpio::{EchoLine, EdgeHandler, Level, TriggerLine};
use parking_lot::Mutex;
use spin_sleep::SpinSleeper;
use std::convert::Infallible;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

/// Echo pulse width per centimeter of target distance, per the HC-SR04
/// timing diagram (two-way trip at ~343 m/s).
const ECHO_US_PER_CM: u64 = 58;

/// Injected trigger-line fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("injected trigger line fault")]
pub struct SimFault;

/// Tunable timing of the simulated transducer.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Delay between the trigger pulse's falling edge and the start of the
    /// echo pulse. Real modules take a few hundred microseconds to emit
    /// their burst.
    pub echo_latency: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            echo_latency: Duration::from_micros(200),
        }
    }
}

struct SimState {
    handler: Option<EdgeHandler>,
    target_distance_cm: Option<u32>,
    trigger_level: Level,
    echo_level: Level,
    faults_to_inject: u32,
    pulses: u64,
}

struct SimShared {
    state: Mutex<SimState>,
}

impl SimShared {
    /// Drive the echo line to `level` and notify the subscriber, capturing
    /// the timestamp at the transition.
    fn echo_transition(&self, level: Level) {
        let mut state = self.state.lock();
        state.echo_level = level;
        if let Some(handler) = state.handler.as_mut() {
            handler(level, Instant::now());
        }
    }
}

/// Handle to a running simulated transducer.
///
/// The worker thread shuts down once this handle and every line created from
/// it have been dropped.
pub struct UltrasonicSim {
    shared: Arc<SimShared>,
    pulses: mpsc::Sender<()>,
}

impl UltrasonicSim {
    /// Spawn the simulator worker thread.
    pub fn spawn(config: SimConfig) -> std::io::Result<Self> {
        let shared = Arc::new(SimShared {
            state: Mutex::new(SimState {
                handler: None,
                target_distance_cm: None,
                trigger_level: Level::Low,
                echo_level: Level::Low,
                faults_to_inject: 0,
                pulses: 0,
            }),
        });

        let (pulse_tx, pulse_rx) = mpsc::channel();
        let worker_shared = Arc::clone(&shared);
        std::thread::Builder::new()
            .name("sonar-sim".into())
            .spawn(move || worker(worker_shared, config, pulse_rx))?;

        debug!(echo_latency_us = config.echo_latency.as_micros() as u64, "simulated transducer online");
        Ok(UltrasonicSim {
            shared,
            pulses: pulse_tx,
        })
    }

    /// Trigger line wired to this simulator.
    pub fn trigger_line(&self) -> SimTriggerLine {
        SimTriggerLine {
            shared: Arc::clone(&self.shared),
            pulses: self.pulses.clone(),
        }
    }

    /// Echo line wired to this simulator.
    pub fn echo_line(&self) -> SimEchoLine {
        SimEchoLine {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Place a (virtual) target at `cm` centimeters, or remove it with
    /// `None` so trigger pulses go unanswered.
    pub fn set_target_distance(&self, cm: Option<u32>) {
        self.shared.state.lock().target_distance_cm = cm;
    }

    /// Make the next `count` calls to [`TriggerLine::set_high`] fail.
    pub fn fail_next_triggers(&self, count: u32) {
        self.shared.state.lock().faults_to_inject = count;
    }

    /// Number of completed trigger pulses observed so far.
    pub fn pulses_sent(&self) -> u64 {
        self.shared.state.lock().pulses
    }

    /// Whether an edge handler is currently installed on the echo line.
    pub fn has_edge_handler(&self) -> bool {
        self.shared.state.lock().handler.is_some()
    }
}

fn worker(shared: Arc<SimShared>, config: SimConfig, pulses: mpsc::Receiver<()>) {
    let sleeper = SpinSleeper::new(10_000);
    while pulses.recv().is_ok() {
        let target = shared.state.lock().target_distance_cm;
        let Some(cm) = target else {
            trace!("trigger pulse ignored, no target in range");
            continue;
        };

        sleeper.sleep(config.echo_latency);
        shared.echo_transition(Level::High);
        sleeper.sleep(Duration::from_micros(u64::from(cm) * ECHO_US_PER_CM));
        shared.echo_transition(Level::Low);
        trace!(cm, "echo pulse delivered");
    }
    debug!("simulated transducer worker exited");
}

/// Trigger line of the simulated transducer.
pub struct SimTriggerLine {
    shared: Arc<SimShared>,
    pulses: mpsc::Sender<()>,
}

impl TriggerLine for SimTriggerLine {
    type Error = SimFault;

    fn set_high(&mut self) -> Result<(), SimFault> {
        let mut state = self.shared.state.lock();
        if state.faults_to_inject > 0 {
            state.faults_to_inject -= 1;
            return Err(SimFault);
        }
        state.trigger_level = Level::High;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), SimFault> {
        let mut state = self.shared.state.lock();
        if state.trigger_level == Level::High {
            state.trigger_level = Level::Low;
            state.pulses += 1;
            // Falling edge completes the pulse; hand it to the worker.
            let _ = self.pulses.send(());
        }
        Ok(())
    }
}

/// Echo line of the simulated transducer.
pub struct SimEchoLine {
    shared: Arc<SimShared>,
}

impl EchoLine for SimEchoLine {
    type Error = Infallible;

    fn read_level(&self) -> Result<Level, Infallible> {
        Ok(self.shared.state.lock().echo_level)
    }

    fn set_edge_handler(&mut self, handler: EdgeHandler) -> Result<(), Infallible> {
        self.shared.state.lock().handler = Some(handler);
        Ok(())
    }

    fn clear_edge_handler(&mut self) -> Result<(), Infallible> {
        // Handler invocations run under the state lock, so dropping the
        // handler here means no invocation can outlive this call.
        self.shared.state.lock().handler = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn recording_handler() -> (EdgeHandler, Arc<Mutex<Vec<(Level, Instant)>>>) {
        let edges: Arc<Mutex<Vec<(Level, Instant)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&edges);
        let handler = Box::new(move |level, at| sink.lock().push((level, at)));
        (handler, edges)
    }

    fn pulse(trigger: &mut SimTriggerLine) {
        trigger.set_high().unwrap();
        thread::sleep(Duration::from_micros(50));
        trigger.set_low().unwrap();
    }

    #[test]
    fn echo_pulse_width_encodes_target_distance() {
        let sim = UltrasonicSim::spawn(SimConfig::default()).unwrap();
        sim.set_target_distance(Some(10)); // 10 cm => 580 us echo pulse
        let mut trigger = sim.trigger_line();
        let mut echo = sim.echo_line();

        let (handler, edges) = recording_handler();
        echo.set_edge_handler(handler).unwrap();

        pulse(&mut trigger);
        thread::sleep(Duration::from_millis(50));

        let edges = edges.lock();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].0, Level::High);
        assert_eq!(edges[1].0, Level::Low);
        let width = edges[1].1 - edges[0].1;
        assert!(width >= Duration::from_micros(580));
        assert!(width < Duration::from_millis(10));
    }

    #[test]
    fn no_target_means_no_echo() {
        let sim = UltrasonicSim::spawn(SimConfig::default()).unwrap();
        let mut trigger = sim.trigger_line();
        let mut echo = sim.echo_line();

        let (handler, edges) = recording_handler();
        echo.set_edge_handler(handler).unwrap();

        pulse(&mut trigger);
        thread::sleep(Duration::from_millis(20));

        assert!(edges.lock().is_empty());
        assert_eq!(sim.pulses_sent(), 1);
    }

    #[test]
    fn injected_fault_fails_one_trigger() {
        let sim = UltrasonicSim::spawn(SimConfig::default()).unwrap();
        let mut trigger = sim.trigger_line();

        sim.fail_next_triggers(1);
        assert_eq!(trigger.set_high(), Err(SimFault));
        assert_eq!(trigger.set_high(), Ok(()));
        assert_eq!(trigger.set_low(), Ok(()));
        assert_eq!(sim.pulses_sent(), 1);
    }

    #[test]
    fn cleared_handler_sees_no_edges() {
        let sim = UltrasonicSim::spawn(SimConfig::default()).unwrap();
        sim.set_target_distance(Some(5));
        let mut trigger = sim.trigger_line();
        let mut echo = sim.echo_line();

        let (handler, edges) = recording_handler();
        echo.set_edge_handler(handler).unwrap();
        assert!(sim.has_edge_handler());
        echo.clear_edge_handler().unwrap();
        assert!(!sim.has_edge_handler());

        pulse(&mut trigger);
        thread::sleep(Duration::from_millis(20));

        assert!(edges.lock().is_empty());
    }

    #[test]
    fn read_level_follows_echo_pulse() {
        let sim = UltrasonicSim::spawn(SimConfig::default()).unwrap();
        sim.set_target_distance(Some(2000)); // 116 ms echo pulse, easy to observe
        let mut trigger = sim.trigger_line();
        let echo = sim.echo_line();

        assert_eq!(echo.read_level().unwrap(), Level::Low);
        pulse(&mut trigger);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(echo.read_level().unwrap(), Level::High);
        thread::sleep(Duration::from_millis(150));
        assert_eq!(echo.read_level().unwrap(), Level::Low);
    }
}
