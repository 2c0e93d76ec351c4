//! ==============================================================================
//! poller.rs - background sampling loop
//! ==============================================================================
//!
//! purpose:
//!     every `interval`, take a fresh reading on every registered sensor.
//!
//! failure handling:
//!     - reader failure on one sensor: logged, the cycle carries on.
//!     - reader panic on one sensor: caught at the blocking-task boundary,
//!       logged, the cycle carries on.
//!     - anything else aborting the cycle: logged, then the loop sleeps for
//!       `backoff` instead of `interval` and tries again. `run` never returns.
//!
//! stopping:
//!     abort the handle returned by `spawn`. an update is short and leaves
//!     state consistent, so abandoning a cycle midway is harmless.
//!
//! ==============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::task::JoinHandle;

use crate::registry::SensorRegistry;

/// Per-cycle tally, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub updated: usize,
    pub skipped: usize,
    pub alerts_raised: usize,
}

pub struct Poller {
    registry: Arc<SensorRegistry>,
    interval: Duration,
    backoff: Duration,
    show_sensor_data: bool,
}

impl Poller {
    pub fn new(registry: Arc<SensorRegistry>, interval: Duration, backoff: Duration) -> Self {
        Self {
            registry,
            interval,
            backoff,
            show_sensor_data: false,
        }
    }

    /// Log every reading at info instead of debug.
    pub fn show_sensor_data(mut self, show: bool) -> Self {
        self.show_sensor_data = show;
        self
    }

    /// One pass over every sensor, in registry order.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let mut summary = CycleSummary::default();

        for (sensor_type, state) in self.registry.iter() {
            let state = state.clone();
            let joined = tokio::task::spawn_blocking(move || state.update()).await;

            match joined {
                Ok(Ok(report)) => {
                    summary.updated += 1;
                    summary.alerts_raised += report.alerts_raised;
                    if self.show_sensor_data {
                        tracing::info!(sensor = sensor_type, measurement = ?report.measurement, alerts = report.alerts_raised, "reading");
                    } else {
                        tracing::debug!(sensor = sensor_type, measurement = ?report.measurement, alerts = report.alerts_raised, "reading");
                    }
                }
                Ok(Err(e)) => {
                    summary.skipped += 1;
                    tracing::warn!(sensor = sensor_type, error = %e, "read failed, keeping previous reading");
                }
                Err(e) if e.is_panic() => {
                    summary.skipped += 1;
                    tracing::error!(sensor = sensor_type, error = %e, "reader panicked");
                }
                Err(e) => {
                    return Err(anyhow!("update task for {} did not complete: {}", sensor_type, e));
                }
            }
        }

        Ok(summary)
    }

    /// Poll forever.
    pub async fn run(self) {
        tracing::info!(
            sensors = self.registry.len(),
            interval_ms = self.interval.as_millis() as u64,
            "poller running"
        );

        loop {
            let outcome = self.run_cycle().await;
            tokio::time::sleep(self.pause_after(&outcome)).await;
        }
    }

    /// How long to wait before the next cycle: `interval` after a completed
    /// cycle, `backoff` after one that faulted.
    fn pause_after(&self, outcome: &Result<CycleSummary>) -> Duration {
        match outcome {
            Ok(summary) => {
                tracing::trace!(?summary, "cycle complete");
                self.interval
            }
            Err(e) => {
                tracing::error!("Error in continuous reading: {:#}", e);
                self.backoff
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
