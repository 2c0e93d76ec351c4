//! ==============================================================================
//! main.rs - sensor hub entry point
//! ==============================================================================
//!
//! purpose:
//!     samples the distance, air-quality and temperature/humidity sensors
//!     once per second and serves the latest readings and alerts over http.
//!
//! responsibilities:
//!     - set up logging
//!     - load configuration (config/sensors.toml or defaults)
//!     - build the sensor registry (one state per sensor)
//!     - run the poller in the background
//!     - serve the json api until ctrl-c
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                      sensor hub (this file)                  │
//!     │  ┌─────────────┐                        ┌─────────────────┐  │
//!     │  │   poller    │                        │   web server    │  │
//!     │  │ (1s cycle)  │                        │   (port 8000)   │  │
//!     │  └──────┬──────┘                        └────────┬────────┘  │
//!     │         │ update                 snapshot / live │           │
//!     │         └──────────────┐      ┌──────────────────┘           │
//!     │                  ┌─────┴──────┴─────┐                        │
//!     │                  │     registry     │ <- registry.rs         │
//!     │                  └─────────┬────────┘                        │
//!     │        (one mutex-guarded SensorState per sensor)            │
//!     └────────────────────────────┼────────────────────────────────┘
//!                                  │ read()
//!              ┌───────────────────┼───────────────────┐
//!              ▼                   ▼                   ▼
//!       ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//!       │ ultrasonic  │     │    mq135    │     │    dht11    │
//!       └─────────────┘     └─────────────┘     └─────────────┘
//!
//! ==============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use sensor_hub::api::{self, ApiState};
use sensor_hub::config::HostConfig;
use sensor_hub::poller::Poller;
use sensor_hub::registry::SensorRegistry;
use sensor_hub::service::SensorService;

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: logging, before config so load warnings are not lost.
    // RUST_LOG wins; otherwise the configured level is applied once known.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| default_filter("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // step 2: load configuration
    let config = HostConfig::load_or_default();
    if !from_env {
        if let Err(e) = filter_handle.reload(default_filter(&config.logging.level)) {
            tracing::warn!("could not apply log level {}: {}", config.logging.level, e);
        }
    }

    tracing::info!("Multi-Sensor IoT API v{}", api::API_VERSION);
    config.log_summary();

    // step 3: sensors
    let registry = Arc::new(SensorRegistry::from_config(&config));
    for (key, sensor) in registry.iter() {
        tracing::info!(sensor = key, sensor_id = sensor.sensor_id(), pins = ?sensor.pins(), "sensor registered");
    }

    // step 4: background polling
    let poller = Poller::new(
        registry.clone(),
        Duration::from_secs(config.polling.interval_seconds),
        Duration::from_secs(config.polling.backoff_seconds),
    )
    .show_sensor_data(config.logging.show_sensor_data)
    .spawn();

    // step 5: web server
    let state = ApiState {
        service: SensorService::new(registry, config.alerts.history_limit),
        update_interval: config.update_interval_label(),
    };
    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server.host / server.port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("API live at http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    poller.abort();
    tracing::info!("sensor hub stopped");
    served.context("web server error")
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("sensor_hub={},tower_http={}", level, level))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
