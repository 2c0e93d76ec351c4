//! ==============================================================================
//! domain.rs - sensor kinds, measurements and read views
//! ==============================================================================
//!
//! purpose:
//!     the shared vocabulary of the sensor core. a `Measurement` is what a
//!     reader produces, `Thresholds` is what the alert policy compares it
//!     against, and `SensorSnapshot` is what the api hands out.
//!
//! relationships:
//!     - produced by: hal.rs (readers build `Measurement`s)
//!     - consumed by: alert.rs (evaluate), sensor.rs (store + snapshot)
//!     - serialized by: api.rs (snapshot json)
//!
//! ==============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::hal::ReadError;

/// The three sensor families this hub knows how to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// hc-sr04 style ultrasonic ranger
    #[serde(rename = "ultrasonic")]
    Distance,
    /// mq-135 gas sensor behind an adc
    AirQuality,
    /// dht11 style combined probe
    #[serde(rename = "temperature_humidity")]
    TempHumidity,
}

impl SensorKind {
    /// Wire name used in the `sensor_type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Distance => "ultrasonic",
            SensorKind::AirQuality => "air_quality",
            SensorKind::TempHumidity => "temperature_humidity",
        }
    }
}

/// A single successful reading. Replaced wholesale on every update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Distance { cm: f64 },
    AirQuality { ppm: f64 },
    TempHumidity { celsius: f64, humidity: f64 },
}

impl Measurement {
    /// Combine a temperature/humidity pair. Both values or neither: a
    /// reading with only one half is a failed cycle.
    pub fn temp_humidity(celsius: Option<f64>, humidity: Option<f64>) -> Result<Self, ReadError> {
        match (celsius, humidity) {
            (Some(celsius), Some(humidity)) => Ok(Measurement::TempHumidity { celsius, humidity }),
            _ => Err(ReadError::Partial),
        }
    }

    pub fn kind(&self) -> SensorKind {
        match self {
            Measurement::Distance { .. } => SensorKind::Distance,
            Measurement::AirQuality { .. } => SensorKind::AirQuality,
            Measurement::TempHumidity { .. } => SensorKind::TempHumidity,
        }
    }
}

/// Per-kind alert bounds. Fixed once the sensor is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Thresholds {
    Distance {
        min_cm: f64,
        max_cm: f64,
    },
    AirQuality {
        warning_ppm: f64,
        danger_ppm: f64,
    },
    TempHumidity {
        temp_low: f64,
        temp_high: f64,
        humidity_low: f64,
        humidity_high: f64,
    },
}

impl Thresholds {
    pub fn kind(&self) -> SensorKind {
        match self {
            Thresholds::Distance { .. } => SensorKind::Distance,
            Thresholds::AirQuality { .. } => SensorKind::AirQuality,
            Thresholds::TempHumidity { .. } => SensorKind::TempHumidity,
        }
    }
}

/// Wiring metadata reported by `/config` and the snapshot `pins` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Pins {
    Ultrasonic { trigger: u8, echo: u8 },
    /// mcp3008 channel
    Analog { analog: u8 },
    Data { data: u8 },
}

/// Fixed identity of a sensor, assigned at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorIdentity {
    pub sensor_id: String,
    pub asset_id: String,
}

/// Qualitative air-quality label derived from the ppm value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityLevel {
    Good,
    Poor,
    Dangerous,
}

impl QualityLevel {
    pub fn classify(ppm: f64, warning_ppm: f64, danger_ppm: f64) -> Self {
        if ppm > danger_ppm {
            QualityLevel::Dangerous
        } else if ppm > warning_ppm {
            QualityLevel::Poor
        } else {
            QualityLevel::Good
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    Active,
    NoReading,
}

/// Kind-specific values of a snapshot, flattened into the json object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReadingValues {
    Distance {
        distance_cm: Option<f64>,
        distance_inches: Option<f64>,
    },
    AirQuality {
        air_quality_ppm: Option<f64>,
        quality_level: Option<QualityLevel>,
    },
    TempHumidity {
        temperature_celsius: Option<f64>,
        temperature_fahrenheit: Option<f64>,
        humidity_percent: Option<f64>,
    },
}

impl ReadingValues {
    /// Build the value block for `kind`, deriving the converted fields from
    /// `measurement`. Every derived field is computed here and nowhere else.
    pub fn derive(thresholds: &Thresholds, measurement: Option<&Measurement>) -> Self {
        match (thresholds, measurement) {
            (Thresholds::Distance { .. }, Some(Measurement::Distance { cm })) => ReadingValues::Distance {
                distance_cm: Some(*cm),
                distance_inches: Some(round2(cm / 2.54)),
            },
            (Thresholds::AirQuality { warning_ppm, danger_ppm }, Some(Measurement::AirQuality { ppm })) => {
                ReadingValues::AirQuality {
                    air_quality_ppm: Some(*ppm),
                    quality_level: Some(QualityLevel::classify(*ppm, *warning_ppm, *danger_ppm)),
                }
            }
            (Thresholds::TempHumidity { .. }, Some(Measurement::TempHumidity { celsius, humidity })) => {
                ReadingValues::TempHumidity {
                    temperature_celsius: Some(*celsius),
                    temperature_fahrenheit: Some(round2(celsius * 9.0 / 5.0 + 32.0)),
                    humidity_percent: Some(*humidity),
                }
            }
            (thresholds, _) => Self::empty(thresholds.kind()),
        }
    }

    fn empty(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Distance => ReadingValues::Distance {
                distance_cm: None,
                distance_inches: None,
            },
            SensorKind::AirQuality => ReadingValues::AirQuality {
                air_quality_ppm: None,
                quality_level: None,
            },
            SensorKind::TempHumidity => ReadingValues::TempHumidity {
                temperature_celsius: None,
                temperature_fahrenheit: None,
                humidity_percent: None,
            },
        }
    }
}

/// Read view of one sensor, as served by `/sensors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSnapshot {
    pub sensor_type: SensorKind,
    pub sensor_id: String,
    #[serde(flatten)]
    pub values: ReadingValues,
    pub timestamp: Option<DateTime<Utc>>,
    pub status: SensorStatus,
    pub pins: Pins,
}

/// Round to two decimal places, the precision every reading is reported at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
