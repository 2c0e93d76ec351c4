//! Fixed mapping from sensor-type key (`ultrasonic`, `mq135`, `dht11`) to
//! its `SensorState`. Built once at startup and shared by the poller and the
//! api; iteration follows insertion order.

use std::sync::Arc;

use thiserror::Error;

use crate::config::HostConfig;
use crate::domain::{Pins, SensorIdentity, Thresholds};
use crate::hal::{Clock, SimulatedAirQuality, SimulatedDistance, SimulatedTempHumidity, SystemClock};
use crate::sensor::SensorState;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Sensor type '{requested}' not found. Available: {available:?}")]
    NotFound { requested: String, available: Vec<String> },
    #[error("sensor type '{0}' registered twice")]
    Duplicate(String),
}

#[derive(Debug, Default)]
pub struct SensorRegistry {
    entries: Vec<(String, Arc<SensorState>)>,
}

impl SensorRegistry {
    pub fn new<I, K>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (K, SensorState)>,
        K: Into<String>,
    {
        let mut registry = Self::default();
        for (key, state) in entries {
            let key = key.into();
            if registry.entries.iter().any(|(k, _)| *k == key) {
                return Err(RegistryError::Duplicate(key));
            }
            registry.entries.push((key, Arc::new(state)));
        }
        Ok(registry)
    }

    /// The three standard sensors, wired to simulated readers.
    pub fn from_config(config: &HostConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let failure_rate = config.simulation.failure_rate;
        let us = &config.sensors.ultrasonic;
        let mq = &config.sensors.mq135;
        let dht = &config.sensors.dht11;

        let entries = vec![
            (
                "ultrasonic".to_string(),
                Arc::new(SensorState::new(
                    SensorIdentity {
                        sensor_id: us.sensor_id.clone(),
                        asset_id: us.asset_id.clone(),
                    },
                    Thresholds::Distance {
                        min_cm: us.min_distance_cm,
                        max_cm: us.max_distance_cm,
                    },
                    Pins::Ultrasonic {
                        trigger: us.trigger_pin,
                        echo: us.echo_pin,
                    },
                    Arc::new(SimulatedDistance::new(failure_rate)),
                    clock.clone(),
                )),
            ),
            (
                "mq135".to_string(),
                Arc::new(SensorState::new(
                    SensorIdentity {
                        sensor_id: mq.sensor_id.clone(),
                        asset_id: mq.asset_id.clone(),
                    },
                    Thresholds::AirQuality {
                        warning_ppm: mq.warning_ppm,
                        danger_ppm: mq.danger_ppm,
                    },
                    Pins::Analog { analog: mq.analog_channel },
                    Arc::new(SimulatedAirQuality::new(failure_rate)),
                    clock.clone(),
                )),
            ),
            (
                "dht11".to_string(),
                Arc::new(SensorState::new(
                    SensorIdentity {
                        sensor_id: dht.sensor_id.clone(),
                        asset_id: dht.asset_id.clone(),
                    },
                    Thresholds::TempHumidity {
                        temp_low: dht.temp_low_c,
                        temp_high: dht.temp_high_c,
                        humidity_low: dht.humidity_low,
                        humidity_high: dht.humidity_high,
                    },
                    Pins::Data { data: dht.data_pin },
                    Arc::new(SimulatedTempHumidity::new(failure_rate)),
                    clock,
                )),
            ),
        ];

        Self { entries }
    }

    pub fn get(&self, sensor_type: &str) -> Result<&Arc<SensorState>, RegistryError> {
        self.entries
            .iter()
            .find(|(key, _)| key == sensor_type)
            .map(|(_, state)| state)
            .ok_or_else(|| RegistryError::NotFound {
                requested: sensor_type.to_string(),
                available: self.keys(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<SensorState>)> {
        self.entries.iter().map(|(key, state)| (key.as_str(), state))
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
