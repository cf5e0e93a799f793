mod config;
mod level;

use anyhow::Context;
use sonar_hal::devices::sim::{SimConfig, UltrasonicSim};
use sonar_ranging::{MeasurementStatus, SensorSession};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const STALENESS_CHECK_PERIOD: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let app = config::load().context("loading configuration")?;

    let sim = UltrasonicSim::spawn(SimConfig::default()).context("spawning the sensor simulator")?;
    sim.set_target_distance(app.sim.target_distance_cm);

    let session =
        SensorSession::start(sim.trigger_line(), sim.echo_line(), app.sensor.trigger_config())
            .context("starting the ranging session")?;
    info!(session = %session.id(), depth_cm = app.tank.depth_cm, "tank gauge running");

    let mut read_tick = tokio::time::interval(app.sensor.read_period());
    let mut stale_tick = tokio::time::interval(STALENESS_CHECK_PERIOD);
    // Both intervals fire immediately once; consume that so the first
    // report waits a full period.
    read_tick.tick().await;
    stale_tick.tick().await;

    let deadline = async {
        match app.run_for_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut last_published = 0u64;
    loop {
        tokio::select! {
            _ = read_tick.tick() => {
                let reading = session.read();
                match reading.distance() {
                    Some(cm) => info!(
                        distance_cm = cm,
                        fill_percent = level::fill_percent(app.tank.depth_cm, cm),
                        "tank level"
                    ),
                    None => match reading.status {
                        MeasurementStatus::NoEcho => warn!("echo lost, no target in range"),
                        _ => info!(status = %reading.status, "no distance yet"),
                    },
                }
            }
            _ = stale_tick.tick() => {
                let published = session.stats().measurements_published;
                if published == last_published {
                    warn!("no new measurements in the last {:?}", STALENESS_CHECK_PERIOD);
                }
                last_published = published;
            }
            _ = &mut deadline => break,
        }
    }

    let stats = session.stats();
    info!(?stats, "run complete, stopping session");
    session.stop().context("stopping the ranging session")?;
    Ok(())
}
