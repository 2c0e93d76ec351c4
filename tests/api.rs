//! Integration tests for the http surface.
//!
//! Drives the router in-process with `oneshot`, using scripted readers so
//! readings and alerts are deterministic.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use sensor_hub::api::{self, ApiState};
use sensor_hub::config::HostConfig;
use sensor_hub::domain::{Measurement, Pins, SensorIdentity, Thresholds};
use sensor_hub::hal::{Clock, ReadError, SensorReader};
use sensor_hub::registry::SensorRegistry;
use sensor_hub::sensor::SensorState;
use sensor_hub::service::SensorService;

// ---------------------------------------------------------------------------
// fixtures
// ---------------------------------------------------------------------------

struct Scripted(Mutex<VecDeque<Result<Measurement, ReadError>>>);

impl Scripted {
    fn new(script: Vec<Result<Measurement, ReadError>>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(script.into())))
    }
}

impl SensorReader for Scripted {
    fn read(&self) -> Result<Measurement, ReadError> {
        self.0.lock().unwrap().pop_front().unwrap_or(Err(ReadError::Timeout))
    }
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn identity(sensor_id: &str, asset_id: &str) -> SensorIdentity {
    SensorIdentity {
        sensor_id: sensor_id.to_string(),
        asset_id: asset_id.to_string(),
    }
}

/// ultrasonic reads 3.0cm then fails; mq135 reads 1100ppm; dht11 never reads.
fn app() -> axum::Router {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()));
    let registry = SensorRegistry::new(vec![
        (
            "ultrasonic",
            SensorState::new(
                identity("ULTRASONIC-01", "DIST-SENSOR-01"),
                Thresholds::Distance { min_cm: 10.0, max_cm: 200.0 },
                Pins::Ultrasonic { trigger: 18, echo: 24 },
                Scripted::new(vec![Ok(Measurement::Distance { cm: 3.0 })]),
                clock.clone(),
            ),
        ),
        (
            "mq135",
            SensorState::new(
                identity("MQ135-01", "AIR-QUALITY-01"),
                Thresholds::AirQuality { warning_ppm: 500.0, danger_ppm: 1000.0 },
                Pins::Analog { analog: 0 },
                Scripted::new(vec![Ok(Measurement::AirQuality { ppm: 1100.0 })]),
                clock.clone(),
            ),
        ),
        (
            "dht11",
            SensorState::new(
                identity("DHT11-01", "TEMP-HUM-01"),
                Thresholds::TempHumidity {
                    temp_low: 5.0,
                    temp_high: 35.0,
                    humidity_low: 20.0,
                    humidity_high: 80.0,
                },
                Pins::Data { data: 22 },
                Scripted::new(vec![Err(ReadError::Partial)]),
                clock,
            ),
        ),
    ])
    .unwrap();

    api::router(ApiState {
        service: SensorService::new(Arc::new(registry), 10),
        update_interval: HostConfig::default().update_interval_label(),
    })
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

// ---------------------------------------------------------------------------
// tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sensors_before_any_reading() {
    let app = app();
    let (status, body) = get(&app, "/sensors").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["shouldSubscribe"], "true");

    let data = body["data"].as_array().unwrap();
    let types: Vec<_> = data.iter().map(|s| s["sensor_type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["ultrasonic", "air_quality", "temperature_humidity"]);
    assert!(data.iter().all(|s| s["status"] == "no_reading" && s["timestamp"].is_null()));
}

#[tokio::test]
async fn live_reading_updates_cache_and_alerts() {
    let app = app();

    let (status, body) = get(&app, "/sensors/ultrasonic/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"], "Fresh measurement taken");
    let reading = &body["data"][0];
    assert_eq!(reading["distance_cm"], 3.0);
    assert_eq!(reading["distance_inches"], 1.18);
    assert_eq!(reading["status"], "active");
    assert_eq!(reading["timestamp"], "2025-06-01T12:00:00Z");
    assert_eq!(reading["pins"]["trigger"], 18);
    assert_eq!(reading["pins"]["echo"], 24);

    // cached endpoint now sees the same value
    let (_, cached) = get(&app, "/sensors/ultrasonic").await;
    assert_eq!(cached["data"][0], *reading);
    assert!(cached.get("note").is_none());

    // reader fails from here on; the stale value stays
    let (status, again) = get(&app, "/sensors/ultrasonic/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["data"][0]["distance_cm"], 3.0);

    let (_, alerts) = get(&app, "/sensors/alerts").await;
    let alerts = alerts["data"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["Failure_x0020_Class"], "Proximity_Warning");
    assert_eq!(alerts[0]["AlertType"], "Proximity Alert");
    assert_eq!(alerts[0]["assetId"], "DIST-SENSOR-01");
    assert_eq!(alerts[0]["id"], format!("ULTRASONIC-01_{}", Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap().timestamp()));
    assert_eq!(alerts[0]["GoogleDriveURL"], "NaN");
}

#[tokio::test]
async fn unknown_sensor_is_404_with_valid_types() {
    let app = app();
    for uri in ["/sensors/lidar", "/sensors/lidar/live"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("'lidar' not found"));
        assert_eq!(body["available"], serde_json::json!(["ultrasonic", "mq135", "dht11"]));
    }
}

#[tokio::test]
async fn health_refreshes_every_sensor() {
    let app = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let report = &body["data"][0];
    assert_eq!(report["status"], "degraded");
    assert_eq!(report["sensors"]["ultrasonic"]["healthy"], true);
    assert_eq!(report["sensors"]["ultrasonic"]["sensor_id"], "ULTRASONIC-01");
    assert_eq!(report["sensors"]["mq135"]["healthy"], true);
    assert_eq!(report["sensors"]["dht11"]["healthy"], false);
    assert!(report["sensors"]["dht11"]["last_reading"].is_null());

    // health took readings, so the cache is now populated
    let (_, mq) = get(&app, "/sensors/mq135").await;
    assert_eq!(mq["data"][0]["air_quality_ppm"], 1100.0);
    assert_eq!(mq["data"][0]["quality_level"], "Dangerous");

    let (_, alerts) = get(&app, "/sensors/alerts").await;
    let classes: Vec<_> = alerts["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["Failure_x0020_Class"].as_str().unwrap().to_string())
        .collect();
    // same timestamp: registry order
    assert_eq!(classes, vec!["Proximity_Warning", "Air_Quality_Critical"]);
}

#[tokio::test]
async fn health_keys_follow_registry_order() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let raw = String::from_utf8(bytes.to_vec()).unwrap();

    // serde_json::Value would re-sort the keys, so look at the raw body
    let at = |key: &str| raw.find(&format!("\"{}\":{{", key)).unwrap();
    assert!(at("ultrasonic") < at("mq135"));
    assert!(at("mq135") < at("dht11"));
}

#[tokio::test]
async fn config_lists_wiring() {
    let app = app();
    let (status, body) = get(&app, "/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api_version"], "2.0.0");
    assert_eq!(body["update_interval"], "1_second");

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[1]["sensor_id"], "MQ135-01");
    assert_eq!(data[1]["sensor_type"], "air_quality");
    assert_eq!(data[1]["asset_id"], "AIR-QUALITY-01");
    assert_eq!(data[1]["pins"]["analog"], 0);
    assert_eq!(data[2]["pins"]["data"], 22);
}

#[tokio::test]
async fn docs_page_lists_sensors() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Multi-Sensor IoT API v2.0.0"));
    assert!(html.contains("ULTRASONIC-01"));
    assert!(html.contains("Data=GPIO 22"));
}
