use sonar_hal::devices::sim::{SimConfig, UltrasonicSim};
use sonar_hal::{EchoLine, TriggerLine};
use std::time::{Duration, Instant};

fn main() {
    let sim = match UltrasonicSim::spawn(SimConfig::default()) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Failed to spawn simulator: {}", e);
            return;
        }
    };
    sim.set_target_distance(Some(25)); // 25 cm => 1450 us echo pulse

    let mut trigger = sim.trigger_line();
    let mut echo = sim.echo_line();

    let started = Instant::now();
    echo.set_edge_handler(Box::new(move |level, at| {
        println!("echo edge: {:?} at +{:?}", level, at - started);
    }))
    .unwrap();

    println!("Firing one 10 us trigger pulse...");
    trigger.set_high().unwrap();
    std::thread::sleep(Duration::from_micros(10));
    trigger.set_low().unwrap();

    // Give the worker time to shape the echo pulse.
    std::thread::sleep(Duration::from_millis(20));
    echo.clear_edge_handler().unwrap();
    println!("Done.");
}
