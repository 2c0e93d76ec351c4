//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `sensors.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: Where the api listens.
//!     - PollingConfig: How often the poller samples, and how long it backs off.
//!     - AlertsConfig: How many alerts per sensor the api exposes.
//!     - SimulationConfig: Fault injection for the simulated readers.
//!     - SensorsConfig: Identity, wiring and thresholds per sensor.
//!
//! every section has serde defaults, so a partial file only overrides what
//! it names.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Env var naming an explicit config file.
pub const CONFIG_ENV: &str = "SENSOR_HUB_CONFIG";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HostConfig {
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub alerts: AlertsConfig,
    pub logging: LoggingConfig,
    pub simulation: SimulationConfig,
    pub sensors: SensorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    /// sleep after an unexpected cycle failure
    pub backoff_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsConfig {
    pub history_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SimulationConfig {
    /// probability (0..=1) that a simulated read fails
    pub failure_rate: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SensorsConfig {
    pub ultrasonic: UltrasonicConfig,
    pub mq135: Mq135Config,
    pub dht11: Dht11Config,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UltrasonicConfig {
    pub sensor_id: String,
    pub asset_id: String,
    pub trigger_pin: u8,
    pub echo_pin: u8,
    pub min_distance_cm: f64,
    pub max_distance_cm: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Mq135Config {
    pub sensor_id: String,
    pub asset_id: String,
    /// mcp3008 channel
    pub analog_channel: u8,
    pub warning_ppm: f64,
    pub danger_ppm: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Dht11Config {
    pub sensor_id: String,
    pub asset_id: String,
    pub data_pin: u8,
    pub temp_low_c: f64,
    pub temp_high_c: f64,
    pub humidity_low: f64,
    pub humidity_high: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{section}: {low_name} ({low}) must be below {high_name} ({high})")]
    Unordered {
        section: &'static str,
        low_name: &'static str,
        low: f64,
        high_name: &'static str,
        high: f64,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("simulation.failure_rate must be within 0..=1, got {0}")]
    FailureRate(f64),
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: HostConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let mut paths = Vec::new();
        if let Ok(explicit) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("config").join("sensors.toml"));
        paths.push(PathBuf::from("..").join("config").join("sensors.toml"));

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("[CONFIG] Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        tracing::warn!("[CONFIG] No config file found - using defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn ordered(
            section: &'static str,
            low_name: &'static str,
            low: f64,
            high_name: &'static str,
            high: f64,
        ) -> Result<(), ConfigError> {
            if low < high {
                Ok(())
            } else {
                Err(ConfigError::Unordered { section, low_name, low, high_name, high })
            }
        }

        let us = &self.sensors.ultrasonic;
        ordered("sensors.ultrasonic", "min_distance_cm", us.min_distance_cm, "max_distance_cm", us.max_distance_cm)?;
        let mq = &self.sensors.mq135;
        ordered("sensors.mq135", "warning_ppm", mq.warning_ppm, "danger_ppm", mq.danger_ppm)?;
        let dht = &self.sensors.dht11;
        ordered("sensors.dht11", "temp_low_c", dht.temp_low_c, "temp_high_c", dht.temp_high_c)?;
        ordered("sensors.dht11", "humidity_low", dht.humidity_low, "humidity_high", dht.humidity_high)?;

        if self.polling.interval_seconds == 0 {
            return Err(ConfigError::Zero("polling.interval_seconds"));
        }
        if self.polling.backoff_seconds == 0 {
            return Err(ConfigError::Zero("polling.backoff_seconds"));
        }
        if self.alerts.history_limit == 0 {
            return Err(ConfigError::Zero("alerts.history_limit"));
        }
        if !(0.0..=1.0).contains(&self.simulation.failure_rate) {
            return Err(ConfigError::FailureRate(self.simulation.failure_rate));
        }
        Ok(())
    }

    /// `/config` wording of the poll interval, e.g. `1_second`.
    pub fn update_interval_label(&self) -> String {
        match self.polling.interval_seconds {
            1 => "1_second".to_string(),
            n => format!("{}_seconds", n),
        }
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            host = %self.server.host,
            port = self.server.port,
            interval_seconds = self.polling.interval_seconds,
            backoff_seconds = self.polling.backoff_seconds,
            history_limit = self.alerts.history_limit,
            failure_rate = self.simulation.failure_rate,
            log_level = %self.logging.level,
            "host configuration"
        );
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8000 }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 1, backoff_seconds: 5 }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self { history_limit: 10 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: false }
    }
}

impl Default for UltrasonicConfig {
    fn default() -> Self {
        Self {
            sensor_id: "ULTRASONIC-01".to_string(),
            asset_id: "DIST-SENSOR-01".to_string(),
            trigger_pin: 18,
            echo_pin: 24,
            min_distance_cm: 10.0,
            max_distance_cm: 200.0,
        }
    }
}

impl Default for Mq135Config {
    fn default() -> Self {
        Self {
            sensor_id: "MQ135-01".to_string(),
            asset_id: "AIR-QUALITY-01".to_string(),
            analog_channel: 0,
            warning_ppm: 500.0,
            danger_ppm: 1000.0,
        }
    }
}

impl Default for Dht11Config {
    fn default() -> Self {
        Self {
            sensor_id: "DHT11-01".to_string(),
            asset_id: "TEMP-HUM-01".to_string(),
            data_pin: 22,
            temp_low_c: 5.0,
            temp_high_c: 35.0,
            humidity_low: 20.0,
            humidity_high: 80.0,
        }
    }
}
