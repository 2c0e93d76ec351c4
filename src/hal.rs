//! ==============================================================================
//! hal.rs - Hardware Abstraction Layer
//! ==============================================================================
//!
//! purpose:
//!     provides a unified "read raw value" capability per sensor.
//!     the sensor core only ever talks to `SensorReader`, so a simulated
//!     reader and a real-hardware reader are interchangeable without
//!     touching state, poller or api code.
//!
//! design philosophy:
//!     - "Compile Anywhere": the default readers are simulated and need no
//!       gpio/spi access.
//!     - "Never Raise": a reader reports failure as a `ReadError` value.
//!       callers treat it as "skip this cycle", never as fatal.
//!     - "Bounded": a reader must return within its own timeout (real hc-sr04
//!       readers wait at most 100ms per echo edge).
//!
//! relationships:
//!     - used by: sensor.rs (SensorState::update), registry.rs (construction)
//!     - uses: rand (simulated values)
//!
//! ==============================================================================

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use crate::domain::{round2, Measurement, SensorKind};

/// Why a read produced no measurement.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReadError {
    #[error("sensor read timed out")]
    Timeout,
    #[error("sensor fault: {0}")]
    Fault(String),
    #[error("incomplete temperature/humidity reading")]
    Partial,
    #[error("reader returned a {got:?} measurement for a {expected:?} sensor")]
    KindMismatch { expected: SensorKind, got: SensorKind },
}

pub trait SensorReader: Send + Sync {
    /// Take one measurement. Must not block past the reader's own timeout.
    fn read(&self) -> Result<Measurement, ReadError>;
}

/// Wall-clock source for reading timestamps and alert ids.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ==============================================================================================
// SIMULATED IMPLEMENTATION (no hardware access)
// ==============================================================================================
// value ranges match what the physical sensors report on the bench, so the
// alert thresholds fire at a realistic rate.

fn should_fail(failure_rate: f64) -> bool {
    failure_rate > 0.0 && rand::thread_rng().gen_bool(failure_rate.min(1.0))
}

/// hc-sr04 stand-in: 5..250 cm.
#[derive(Debug, Clone)]
pub struct SimulatedDistance {
    failure_rate: f64,
}

impl SimulatedDistance {
    pub fn new(failure_rate: f64) -> Self {
        tracing::debug!("[SIM ULTRASONIC] failure rate {}", failure_rate);
        Self { failure_rate }
    }
}

impl SensorReader for SimulatedDistance {
    fn read(&self) -> Result<Measurement, ReadError> {
        if should_fail(self.failure_rate) {
            // a real ranger misses the echo edge
            return Err(ReadError::Timeout);
        }
        let cm = rand::thread_rng().gen_range(5.0..250.0);
        Ok(Measurement::Distance { cm: round2(cm) })
    }
}

/// mq-135 stand-in: 50..1200 ppm.
#[derive(Debug, Clone)]
pub struct SimulatedAirQuality {
    failure_rate: f64,
}

impl SimulatedAirQuality {
    pub fn new(failure_rate: f64) -> Self {
        tracing::debug!("[SIM MQ135] failure rate {}", failure_rate);
        Self { failure_rate }
    }
}

impl SensorReader for SimulatedAirQuality {
    fn read(&self) -> Result<Measurement, ReadError> {
        if should_fail(self.failure_rate) {
            return Err(ReadError::Timeout);
        }
        let ppm = rand::thread_rng().gen_range(50.0..1200.0);
        Ok(Measurement::AirQuality { ppm: round2(ppm) })
    }
}

/// dht11 stand-in: 15..40 °C, 30..90 %.
#[derive(Debug, Clone)]
pub struct SimulatedTempHumidity {
    failure_rate: f64,
}

impl SimulatedTempHumidity {
    pub fn new(failure_rate: f64) -> Self {
        tracing::debug!("[SIM DHT11] failure rate {}", failure_rate);
        Self { failure_rate }
    }
}

impl SensorReader for SimulatedTempHumidity {
    fn read(&self) -> Result<Measurement, ReadError> {
        let mut rng = rand::thread_rng();
        let humidity = round2(rng.gen_range(30.0..90.0));
        // dht11 checksum failures typically lose the temperature half only
        let celsius = if should_fail(self.failure_rate) {
            None
        } else {
            Some(round2(rng.gen_range(15.0..40.0)))
        };
        Measurement::temp_humidity(celsius, Some(humidity))
    }
}
