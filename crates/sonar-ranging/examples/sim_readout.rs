use sonar_hal::devices::sim::{SimConfig, UltrasonicSim};
use sonar_ranging::{Measurement, SensorSession, TriggerConfig};
use std::time::Duration;

fn main() {
    let sim = match UltrasonicSim::spawn(SimConfig::default()) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Failed to spawn simulator: {}", e);
            return;
        }
    };
    sim.set_target_distance(Some(57));

    let config = TriggerConfig::new(Duration::from_micros(10), Duration::from_millis(50));
    let session = match SensorSession::start(sim.trigger_line(), sim.echo_line(), config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to start session: {}", e);
            return;
        }
    };
    println!("Session {} measuring a simulated target...", session.id());

    for i in 0..10 {
        std::thread::sleep(Duration::from_millis(200));
        let reading: Measurement = session.read();
        match reading.distance() {
            Some(cm) => println!("reading {}: {} cm", i, cm),
            None => println!("reading {}: {}", i, reading),
        }
        if i == 4 {
            println!("-- moving the target to 112 cm --");
            sim.set_target_distance(Some(112));
        }
    }

    match session.stop() {
        Ok(_) => println!("Session stopped cleanly."),
        Err(e) => eprintln!("Teardown failed: {}", e),
    }
    println!("Done.");
}
