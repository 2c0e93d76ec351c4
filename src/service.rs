//! Query/update façade: the operations the http layer calls.
//!
//! Cached reads (`get_all`, `get_one`, `get_alerts`, `config`) only copy
//! state out. `get_live` and `health` take a fresh reading first, off the
//! async workers, and wait for it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::alert::AlertRecord;
use crate::domain::{Pins, SensorKind, SensorSnapshot, SensorStatus};
use crate::hal::ReadError;
use crate::registry::{RegistryError, SensorRegistry};
use crate::sensor::{SensorState, UpdateReport};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorHealth {
    Checked {
        healthy: bool,
        last_reading: Option<DateTime<Utc>>,
        sensor_id: String,
    },
    /// the update itself blew up (reader panic)
    Failed { healthy: bool, error: String },
}

impl SensorHealth {
    pub fn is_healthy(&self) -> bool {
        match self {
            SensorHealth::Checked { healthy, .. } | SensorHealth::Failed { healthy, .. } => *healthy,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// registry order
    pub sensors: IndexMap<String, SensorHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorConfigEntry {
    pub sensor_id: String,
    pub sensor_type: SensorKind,
    pub pins: Pins,
    pub asset_id: String,
}

#[derive(Clone)]
pub struct SensorService {
    registry: Arc<SensorRegistry>,
    alert_window: usize,
}

impl SensorService {
    pub fn new(registry: Arc<SensorRegistry>, alert_window: usize) -> Self {
        Self { registry, alert_window }
    }

    pub fn registry(&self) -> &Arc<SensorRegistry> {
        &self.registry
    }

    pub fn sensor_types(&self) -> Vec<String> {
        self.registry.keys()
    }

    pub fn get_all(&self) -> Vec<SensorSnapshot> {
        self.registry.iter().map(|(_, state)| state.snapshot()).collect()
    }

    pub fn get_one(&self, sensor_type: &str) -> Result<SensorSnapshot, ServiceError> {
        Ok(self.registry.get(sensor_type)?.snapshot())
    }

    /// Take a reading now and return the resulting view. A failed read is
    /// not an error here: the caller gets the previous reading back.
    pub async fn get_live(&self, sensor_type: &str) -> Result<SensorSnapshot, ServiceError> {
        let state = self.registry.get(sensor_type)?.clone();
        if let Err(e) = update_blocking(state.clone()).await? {
            tracing::warn!(sensor = sensor_type, error = %e, "live read failed, serving cached reading");
        }
        Ok(state.snapshot())
    }

    /// The newest alerts of every sensor, newest first. Alerts with the same
    /// date keep registry order, then log order.
    pub fn get_alerts(&self) -> Vec<AlertRecord> {
        let mut alerts: Vec<AlertRecord> = self
            .registry
            .iter()
            .flat_map(|(_, state)| state.recent_alerts(self.alert_window))
            .collect();
        // stable
        alerts.sort_by(|a, b| b.date.cmp(&a.date));
        alerts
    }

    /// Re-read every sensor, then report which ones have ever produced a
    /// reading.
    pub async fn health(&self) -> HealthReport {
        let mut sensors = IndexMap::new();
        let mut overall = true;

        for (sensor_type, state) in self.registry.iter() {
            let entry = match update_blocking(state.clone()).await {
                Ok(result) => {
                    if let Err(e) = result {
                        tracing::warn!(sensor = sensor_type, error = %e, "health read failed, reporting cached state");
                    }
                    let snapshot = state.snapshot();
                    SensorHealth::Checked {
                        healthy: snapshot.status == SensorStatus::Active,
                        last_reading: snapshot.timestamp,
                        sensor_id: snapshot.sensor_id,
                    }
                }
                Err(e) => {
                    tracing::error!(sensor = sensor_type, error = %e, "health check failed");
                    SensorHealth::Failed {
                        healthy: false,
                        error: e.to_string(),
                    }
                }
            };
            overall &= entry.is_healthy();
            sensors.insert(sensor_type.to_string(), entry);
        }

        HealthReport {
            status: if overall { "healthy" } else { "degraded" },
            timestamp: Utc::now(),
            sensors,
        }
    }

    pub fn config(&self) -> Vec<SensorConfigEntry> {
        self.registry
            .iter()
            .map(|(_, state)| SensorConfigEntry {
                sensor_id: state.sensor_id().to_string(),
                sensor_type: state.kind(),
                pins: state.pins(),
                asset_id: state.asset_id().to_string(),
            })
            .collect()
    }
}

/// Run `update` on the blocking pool. The outer error is a panicked or
/// cancelled task; the inner one is an ordinary read failure.
async fn update_blocking(state: Arc<SensorState>) -> Result<Result<UpdateReport, ReadError>, ServiceError> {
    tokio::task::spawn_blocking(move || state.update())
        .await
        .map_err(|e| ServiceError::Internal(format!("sensor update failed: {}", e)))
}
