use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use sonar_ranging::TriggerConfig;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Top-level settings for the gauge binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sensor: SensorSettings,
    pub tank: TankSettings,
    pub sim: SimSettings,
    /// Stop after this many seconds; run until killed when absent.
    pub run_for_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub pulse_width_us: u64,
    pub period_ms: u64,
    /// Report echo loss after this many silent cycles; zero or absent
    /// disables the watchdog.
    pub no_echo_after_cycles: Option<u32>,
    pub read_period_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TankSettings {
    /// Distance from the sensor to the tank floor.
    pub depth_cm: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Simulated target distance; absent means the echo never returns.
    pub target_distance_cm: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            sensor: SensorSettings::default(),
            tank: TankSettings::default(),
            sim: SimSettings::default(),
            run_for_secs: None,
        }
    }
}

impl Default for SensorSettings {
    fn default() -> Self {
        SensorSettings {
            pulse_width_us: 10,
            period_ms: 100,
            no_echo_after_cycles: None,
            read_period_ms: 1000,
        }
    }
}

impl Default for TankSettings {
    fn default() -> Self {
        TankSettings { depth_cm: 100 }
    }
}

impl Default for SimSettings {
    fn default() -> Self {
        SimSettings { target_distance_cm: None }
    }
}

impl SensorSettings {
    pub fn trigger_config(&self) -> TriggerConfig {
        let config = TriggerConfig::new(
            Duration::from_micros(self.pulse_width_us),
            Duration::from_millis(self.period_ms),
        );
        match self.no_echo_after_cycles.and_then(NonZeroU32::new) {
            Some(cycles) => config.with_no_echo_after(cycles),
            None => config,
        }
    }

    pub fn read_period(&self) -> Duration {
        Duration::from_millis(self.read_period_ms)
    }
}

pub fn load() -> Result<AppConfig, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true))
        .build();

    match settings.and_then(Config::try_deserialize::<AppConfig>) {
        Ok(config) => {
            info!("Successfully loaded configuration: {:?}", config);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let app = parse("");
        assert_eq!(app.sensor.pulse_width_us, 10);
        assert_eq!(app.sensor.period_ms, 100);
        assert_eq!(app.sensor.read_period_ms, 1000);
        assert_eq!(app.tank.depth_cm, 100);
        assert!(app.sim.target_distance_cm.is_none());
        assert!(app.run_for_secs.is_none());
    }

    #[test]
    fn settings_map_onto_a_trigger_config() {
        let app = parse(
            "[sensor]\n\
             pulse_width_us = 12\n\
             period_ms = 60\n\
             no_echo_after_cycles = 5\n",
        );
        let config = app.sensor.trigger_config();
        assert_eq!(config.pulse_width, Duration::from_micros(12));
        assert_eq!(config.period, Duration::from_millis(60));
        assert_eq!(config.no_echo_after_cycles, NonZeroU32::new(5));
    }

    #[test]
    fn zero_watchdog_cycles_disable_the_watchdog() {
        let app = parse("[sensor]\nno_echo_after_cycles = 0\n");
        assert!(app.sensor.trigger_config().no_echo_after_cycles.is_none());
    }

    #[test]
    fn partial_sections_fill_in_the_rest() {
        let app = parse(
            "run_for_secs = 30\n\
             [tank]\n\
             depth_cm = 250\n\
             [sim]\n\
             target_distance_cm = 42\n",
        );
        assert_eq!(app.run_for_secs, Some(30));
        assert_eq!(app.tank.depth_cm, 250);
        assert_eq!(app.sim.target_distance_cm, Some(42));
        assert_eq!(app.sensor.period_ms, 100);
    }
}
