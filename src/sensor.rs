//! ==============================================================================
//! sensor.rs - per-sensor state
//! ==============================================================================
//!
//! purpose:
//!     one `SensorState` per physical sensor. it owns the last measurement,
//!     the time it was taken and the sensor's alert log.
//!
//! locking:
//!     the (measurement, timestamp, alert log) triple sits behind a single
//!     std mutex per sensor. the lock is held only to stamp and commit a
//!     reading or to copy out, never across the reader call, so a slow read
//!     never blocks readers of this or any other sensor.
//!
//! no code path may hold two sensors' locks at once. aggregate reads
//! (alerts, health) visit sensors one at a time and release in between.
//!
//! ==============================================================================

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::alert::{self, AlertRecord};
use crate::domain::{Measurement, Pins, ReadingValues, SensorIdentity, SensorKind, SensorSnapshot, SensorStatus, Thresholds};
use crate::hal::{Clock, ReadError, SensorReader};

#[derive(Debug, Default)]
struct Inner {
    /// last successful reading and when it was taken; both or neither
    current: Option<(Measurement, DateTime<Utc>)>,
    /// oldest first
    alerts: Vec<AlertRecord>,
}

/// Outcome of a successful `update`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    pub measurement: Measurement,
    pub taken_at: DateTime<Utc>,
    pub alerts_raised: usize,
}

pub struct SensorState {
    identity: SensorIdentity,
    thresholds: Thresholds,
    pins: Pins,
    reader: Arc<dyn SensorReader>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl SensorState {
    pub fn new(
        identity: SensorIdentity,
        thresholds: Thresholds,
        pins: Pins,
        reader: Arc<dyn SensorReader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            thresholds,
            pins,
            reader,
            clock,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.identity.sensor_id
    }

    pub fn asset_id(&self) -> &str {
        &self.identity.asset_id
    }

    pub fn kind(&self) -> SensorKind {
        self.thresholds.kind()
    }

    pub fn pins(&self) -> Pins {
        self.pins
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    // the guarded triple is always written in one step, so a panic elsewhere
    // cannot leave it half-updated
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a new reading and record any alerts it raises.
    ///
    /// On a failed read the previous reading is kept as-is and no alert is
    /// recorded; the error is handed back for the caller to log. Blocks for
    /// as long as the reader does.
    pub fn update(&self) -> Result<UpdateReport, ReadError> {
        let measurement = self.reader.read()?;
        if measurement.kind() != self.kind() {
            return Err(ReadError::KindMismatch {
                expected: self.kind(),
                got: measurement.kind(),
            });
        }

        // stamp, evaluate and commit under one lock so racing updates land
        // in timestamp order
        let mut inner = self.lock();
        let taken_at = self.clock.now();
        let alerts = alert::evaluate(&measurement, &self.thresholds, &self.identity, taken_at);
        let alerts_raised = alerts.len();
        inner.current = Some((measurement, taken_at));
        Self::push_alerts(&mut inner, alerts);
        drop(inner);

        Ok(UpdateReport {
            measurement,
            taken_at,
            alerts_raised,
        })
    }

    fn push_alerts(inner: &mut Inner, alerts: Vec<AlertRecord>) {
        inner.alerts.extend(alerts);
    }

    /// Current read view. Derived fields are computed from the copy taken
    /// under the lock, so they always match the stored raw value.
    pub fn snapshot(&self) -> SensorSnapshot {
        let current = self.lock().current;
        let (measurement, timestamp) = match current {
            Some((m, at)) => (Some(m), Some(at)),
            None => (None, None),
        };

        SensorSnapshot {
            sensor_type: self.kind(),
            sensor_id: self.identity.sensor_id.clone(),
            values: ReadingValues::derive(&self.thresholds, measurement.as_ref()),
            timestamp,
            status: if timestamp.is_some() {
                SensorStatus::Active
            } else {
                SensorStatus::NoReading
            },
            pins: self.pins,
        }
    }

    /// The newest `limit` alerts, oldest first.
    pub fn recent_alerts(&self, limit: usize) -> Vec<AlertRecord> {
        let inner = self.lock();
        let start = inner.alerts.len().saturating_sub(limit);
        inner.alerts[start..].to_vec()
    }

    pub fn alert_count(&self) -> usize {
        self.lock().alerts.len()
    }
}

impl std::fmt::Debug for SensorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorState")
            .field("identity", &self.identity)
            .field("thresholds", &self.thresholds)
            .field("pins", &self.pins)
            .finish_non_exhaustive()
    }
}
