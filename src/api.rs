//! ==============================================================================
//! api.rs - http surface
//! ==============================================================================
//!
//! purpose:
//!     thin axum layer over `SensorService`. handlers only shape json; every
//!     decision about readings and alerts lives in the service and below.
//!
//! routes:
//!     GET /                       html documentation page
//!     GET /sensors                every cached snapshot
//!     GET /sensors/alerts         recent alerts, newest first
//!     GET /sensors/:type          one cached snapshot
//!     GET /sensors/:type/live     fresh reading, then snapshot
//!     GET /health                 fresh reading of every sensor + verdict
//!     GET /config                 wiring and identity of every sensor
//!
//! errors:
//!     always `{ "success": false, "error": "..." }`, 404 for an unknown
//!     sensor type (with the valid keys), 500 otherwise.
//!
//! ==============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::alert::AlertRecord;
use crate::domain::{Pins, SensorSnapshot};
use crate::registry::RegistryError;
use crate::service::{HealthReport, SensorConfigEntry, SensorService, ServiceError};

pub const API_VERSION: &str = "2.0.0";

// ==============================================================================
// shared state
// ==============================================================================

#[derive(Clone)]
pub struct ApiState {
    pub service: SensorService,
    /// e.g. "1_second", reported by /config
    pub update_interval: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(docs_handler))
        .route("/sensors", get(all_sensors_handler))
        .route("/sensors/alerts", get(alerts_handler))
        .route("/sensors/:sensor_type", get(sensor_handler))
        .route("/sensors/:sensor_type/live", get(live_sensor_handler))
        .route("/health", get(health_handler))
        .route("/config", get(config_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ==============================================================================
// response envelopes
// ==============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    #[serde(rename = "shouldSubscribe")]
    pub should_subscribe: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    fn ok(data: Vec<T>) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            should_subscribe: "true",
            note: None,
        })
    }

    fn with_note(data: Vec<T>, note: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            should_subscribe: "true",
            note: Some(note),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub success: bool,
    pub data: Vec<SensorConfigEntry>,
    #[serde(rename = "shouldSubscribe")]
    pub should_subscribe: &'static str,
    pub api_version: &'static str,
    pub update_interval: String,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound { message: String, available: Vec<String> },
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<&'a [String]>,
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Registry(e) => match &e {
                RegistryError::NotFound { available, .. } => ApiError::NotFound {
                    available: available.clone(),
                    message: e.to_string(),
                },
                RegistryError::Duplicate(_) => ApiError::Internal(e.to_string()),
            },
            ServiceError::Internal(message) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, available) = match &self {
            ApiError::NotFound { message, available } => (StatusCode::NOT_FOUND, message.as_str(), Some(available.as_slice())),
            ApiError::Internal(message) => {
                tracing::error!("request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message.as_str(), None)
            }
        };
        let body = ErrorBody {
            success: false,
            error: message,
            available,
        };
        (status, Json(body)).into_response()
    }
}

// ==============================================================================
// handlers
// ==============================================================================

async fn all_sensors_handler(State(state): State<ApiState>) -> Json<ApiResponse<SensorSnapshot>> {
    ApiResponse::ok(state.service.get_all())
}

async fn alerts_handler(State(state): State<ApiState>) -> Json<ApiResponse<AlertRecord>> {
    ApiResponse::ok(state.service.get_alerts())
}

async fn sensor_handler(
    State(state): State<ApiState>,
    Path(sensor_type): Path<String>,
) -> Result<Json<ApiResponse<SensorSnapshot>>, ApiError> {
    let snapshot = state.service.get_one(&sensor_type)?;
    Ok(ApiResponse::ok(vec![snapshot]))
}

async fn live_sensor_handler(
    State(state): State<ApiState>,
    Path(sensor_type): Path<String>,
) -> Result<Json<ApiResponse<SensorSnapshot>>, ApiError> {
    let snapshot = state.service.get_live(&sensor_type).await?;
    Ok(ApiResponse::with_note(vec![snapshot], "Fresh measurement taken"))
}

async fn health_handler(State(state): State<ApiState>) -> Json<ApiResponse<HealthReport>> {
    let report = state.service.health().await;
    if !report.is_healthy() {
        tracing::warn!(sensors = ?report.sensors, "health check degraded");
    }
    ApiResponse::ok(vec![report])
}

async fn config_handler(State(state): State<ApiState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        success: true,
        data: state.service.config(),
        should_subscribe: "true",
        api_version: API_VERSION,
        update_interval: state.update_interval.clone(),
    })
}

/// human-readable landing page, generated from the registry so the sensor
/// list and wiring never go stale
async fn docs_handler(State(state): State<ApiState>) -> Html<String> {
    let endpoints = [
        ("/sensors", "Get all sensor readings"),
        ("/sensors/alerts", "Get all sensor alerts"),
        ("/sensors/{sensor_type}", "Get specific sensor reading"),
        ("/sensors/{sensor_type}/live", "Get fresh sensor reading"),
        ("/health", "Health check all sensors"),
        ("/config", "Get sensor configurations"),
    ];

    let mut endpoint_html = String::new();
    for (path, what) in endpoints {
        endpoint_html.push_str(&format!(
            "<div class=\"endpoint\"><span class=\"method\">GET</span> <strong>{}</strong> - {}</div>\n",
            html_escape(path),
            what
        ));
    }

    let mut sensor_html = String::new();
    for (key, sensor) in state.service.registry().iter() {
        let pins = match sensor.pins() {
            Pins::Ultrasonic { trigger, echo } => format!("Trigger=GPIO {}, Echo=GPIO {}", trigger, echo),
            Pins::Analog { analog } => format!("Analog=MCP3008 CH{}", analog),
            Pins::Data { data } => format!("Data=GPIO {}", data),
        };
        sensor_html.push_str(&format!(
            "<li><strong>{}</strong> - {} {} ({})</li>\n",
            html_escape(key),
            html_escape(sensor.kind().as_str()),
            html_escape(sensor.sensor_id()),
            pins
        ));
    }

    Html(format!(
        r#"<!doctype html>
<html>
<head>
    <title>Multi-Sensor IoT API</title>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 40px; }}
        .endpoint {{ background: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 5px; }}
        .method {{ color: #007acc; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>Multi-Sensor IoT API v{version}</h1>
    <h2>Available Endpoints:</h2>
    {endpoints}
    <h2>Supported Sensors:</h2>
    <ul>
    {sensors}
    </ul>
</body>
</html>"#,
        version = API_VERSION,
        endpoints = endpoint_html,
        sensors = sensor_html,
    ))
}

/// escape html special characters to prevent xss
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>\"x\" & y</b>"), "&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;");
    }

    #[test]
    fn test_not_found_message_lists_keys() {
        let err = ApiError::from(ServiceError::Registry(RegistryError::NotFound {
            requested: "lidar".to_string(),
            available: vec!["ultrasonic".to_string(), "mq135".to_string()],
        }));
        match err {
            ApiError::NotFound { message, available } => {
                assert_eq!(message, "Sensor type 'lidar' not found. Available: [\"ultrasonic\", \"mq135\"]");
                assert_eq!(available, vec!["ultrasonic", "mq135"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
