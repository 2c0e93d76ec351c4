//! Alert policy and the alert record served by `/sensors/alerts`.
//!
//! `evaluate` is a pure function of the measurement, the sensor's thresholds
//! and the generation time. Bounds are inclusive: only a strictly greater or
//! strictly smaller value raises an alert. Descriptions print values as
//! the readers stored them (already rounded to two decimals).

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::domain::{Measurement, SensorIdentity, Thresholds};

/// Value the downstream schema expects for fields this system never fills.
pub const NOT_APPLICABLE: &str = "NaN";

/// Originating application reported in every record.
pub const APP_NAME: &str = "IoT Sensor System";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FailureClass {
    #[serde(rename = "Proximity_Warning")]
    ProximityWarning,
    #[serde(rename = "Range_Warning")]
    RangeWarning,
    #[serde(rename = "Air_Quality_Critical")]
    AirQualityCritical,
    #[serde(rename = "Air_Quality_Warning")]
    AirQualityWarning,
    #[serde(rename = "Temperature_High")]
    TemperatureHigh,
    #[serde(rename = "Temperature_Low")]
    TemperatureLow,
    #[serde(rename = "Humidity_High")]
    HumidityHigh,
    #[serde(rename = "Humidity_Low")]
    HumidityLow,
}

impl FailureClass {
    pub fn alert_type(&self) -> &'static str {
        match self {
            FailureClass::ProximityWarning => "Proximity Alert",
            FailureClass::RangeWarning => "Range Alert",
            FailureClass::AirQualityCritical => "Air Quality Critical",
            FailureClass::AirQualityWarning => "Air Quality Warning",
            FailureClass::TemperatureHigh | FailureClass::TemperatureLow => "Temperature Alert",
            FailureClass::HumidityHigh | FailureClass::HumidityLow => "Humidity Alert",
        }
    }
}

/// One generated alert. Append-only once stored in a sensor's log.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    /// `{sensor_id}_{unix_seconds}`; two alerts from one sensor within the
    /// same second share an id.
    pub id: String,
    pub asset_id: String,
    pub failure_class: FailureClass,
    pub description: String,
    pub date: DateTime<Utc>,
}

impl AlertRecord {
    pub fn new(source: &SensorIdentity, failure_class: FailureClass, description: String, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("{}_{}", source.sensor_id, now.timestamp()),
            asset_id: source.asset_id.clone(),
            failure_class,
            description,
            date: now,
        }
    }

    pub fn alert_type(&self) -> &'static str {
        self.failure_class.alert_type()
    }
}

// the consumer's list schema uses these exact (sharepoint-encoded) column names
impl Serialize for AlertRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("AlertRecord", 16)?;
        s.serialize_field("AlertType", self.alert_type())?;
        s.serialize_field("assetId", &self.asset_id)?;
        s.serialize_field("Description", &self.description)?;
        s.serialize_field("Date", &self.date)?;
        s.serialize_field("Report", NOT_APPLICABLE)?;
        s.serialize_field("App", APP_NAME)?;
        s.serialize_field("anchor", &self.asset_id)?;
        s.serialize_field("Stage_x007b__x0023__x007d_", NOT_APPLICABLE)?;
        s.serialize_field("Failure_x0020_Class", &self.failure_class)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("Priority", NOT_APPLICABLE)?;
        s.serialize_field("OperatorNumber", NOT_APPLICABLE)?;
        s.serialize_field("OperatorName", NOT_APPLICABLE)?;
        s.serialize_field("ManagerName", NOT_APPLICABLE)?;
        s.serialize_field("ManagerNumber", NOT_APPLICABLE)?;
        s.serialize_field("GoogleDriveURL", NOT_APPLICABLE)?;
        s.end()
    }
}

/// Map a measurement onto zero, one or two alerts.
///
/// A measurement of a different kind than `thresholds` yields nothing;
/// `SensorState` rejects such readings before they get here.
pub fn evaluate(
    measurement: &Measurement,
    thresholds: &Thresholds,
    source: &SensorIdentity,
    now: DateTime<Utc>,
) -> Vec<AlertRecord> {
    let alert = |class: FailureClass, description: String| AlertRecord::new(source, class, description, now);
    let mut alerts = Vec::new();

    match (*measurement, *thresholds) {
        (Measurement::Distance { cm }, Thresholds::Distance { min_cm, max_cm }) => {
            if cm < min_cm {
                alerts.push(alert(
                    FailureClass::ProximityWarning,
                    format!("Object detected within {:?}cm. Current distance: {:?}cm", min_cm, cm),
                ));
            } else if cm > max_cm {
                alerts.push(alert(
                    FailureClass::RangeWarning,
                    format!("No object detected within range. Current distance: {:?}cm", cm),
                ));
            }
        }
        (Measurement::AirQuality { ppm }, Thresholds::AirQuality { warning_ppm, danger_ppm }) => {
            if ppm > danger_ppm {
                alerts.push(alert(
                    FailureClass::AirQualityCritical,
                    format!("Dangerous air quality detected: {:?} PPM. Immediate action required.", ppm),
                ));
            } else if ppm > warning_ppm {
                alerts.push(alert(
                    FailureClass::AirQualityWarning,
                    format!("Poor air quality detected: {:?} PPM. Monitor closely.", ppm),
                ));
            }
        }
        (
            Measurement::TempHumidity { celsius, humidity },
            Thresholds::TempHumidity { temp_low, temp_high, humidity_low, humidity_high },
        ) => {
            // temperature and humidity are judged independently
            if celsius > temp_high {
                alerts.push(alert(
                    FailureClass::TemperatureHigh,
                    format!("High temperature detected: {:?}°C", celsius),
                ));
            } else if celsius < temp_low {
                alerts.push(alert(
                    FailureClass::TemperatureLow,
                    format!("Low temperature detected: {:?}°C", celsius),
                ));
            }

            if humidity > humidity_high {
                alerts.push(alert(
                    FailureClass::HumidityHigh,
                    format!("High humidity detected: {:?}%", humidity),
                ));
            } else if humidity < humidity_low {
                alerts.push(alert(
                    FailureClass::HumidityLow,
                    format!("Low humidity detected: {:?}%", humidity),
                ));
            }
        }
        _ => {}
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source() -> SensorIdentity {
        SensorIdentity {
            sensor_id: "ULTRASONIC-01".to_string(),
            asset_id: "DIST-SENSOR-01".to_string(),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
    }

    const DISTANCE: Thresholds = Thresholds::Distance { min_cm: 10.0, max_cm: 200.0 };
    const AIR: Thresholds = Thresholds::AirQuality { warning_ppm: 500.0, danger_ppm: 1000.0 };
    const CLIMATE: Thresholds = Thresholds::TempHumidity {
        temp_low: 5.0,
        temp_high: 35.0,
        humidity_low: 20.0,
        humidity_high: 80.0,
    };

    fn classes(measurement: Measurement, thresholds: Thresholds) -> Vec<FailureClass> {
        evaluate(&measurement, &thresholds, &source(), at())
            .into_iter()
            .map(|a| a.failure_class)
            .collect()
    }

    #[test]
    fn test_distance_rules() {
        assert_eq!(classes(Measurement::Distance { cm: 3.0 }, DISTANCE), vec![FailureClass::ProximityWarning]);
        assert_eq!(classes(Measurement::Distance { cm: 9.99 }, DISTANCE), vec![FailureClass::ProximityWarning]);
        assert_eq!(classes(Measurement::Distance { cm: 200.01 }, DISTANCE), vec![FailureClass::RangeWarning]);
        for cm in [10.0, 55.5, 200.0] {
            assert!(classes(Measurement::Distance { cm }, DISTANCE).is_empty(), "{} cm should be in range", cm);
        }
    }

    #[test]
    fn test_air_quality_danger_excludes_warning() {
        assert_eq!(classes(Measurement::AirQuality { ppm: 1100.0 }, AIR), vec![FailureClass::AirQualityCritical]);
        assert_eq!(classes(Measurement::AirQuality { ppm: 750.0 }, AIR), vec![FailureClass::AirQualityWarning]);
        assert!(classes(Measurement::AirQuality { ppm: 500.0 }, AIR).is_empty());
        assert_eq!(classes(Measurement::AirQuality { ppm: 1000.0 }, AIR), vec![FailureClass::AirQualityWarning]);
    }

    #[test]
    fn test_temp_humidity_dimensions_are_independent() {
        assert_eq!(
            classes(Measurement::TempHumidity { celsius: 40.0, humidity: 50.0 }, CLIMATE),
            vec![FailureClass::TemperatureHigh]
        );
        assert_eq!(
            classes(Measurement::TempHumidity { celsius: 2.0, humidity: 85.0 }, CLIMATE),
            vec![FailureClass::TemperatureLow, FailureClass::HumidityHigh]
        );
        assert_eq!(
            classes(Measurement::TempHumidity { celsius: 20.0, humidity: 10.0 }, CLIMATE),
            vec![FailureClass::HumidityLow]
        );
        assert!(classes(Measurement::TempHumidity { celsius: 35.0, humidity: 20.0 }, CLIMATE).is_empty());
    }

    #[test]
    fn test_mismatched_kind_yields_nothing() {
        assert!(classes(Measurement::AirQuality { ppm: 5000.0 }, DISTANCE).is_empty());
    }

    #[test]
    fn test_alert_id_uses_unix_seconds() {
        let alerts = evaluate(&Measurement::Distance { cm: 3.0 }, &DISTANCE, &source(), at());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, format!("ULTRASONIC-01_{}", at().timestamp()));
        assert_eq!(alerts[0].description, "Object detected within 10.0cm. Current distance: 3.0cm");
    }

    #[test]
    fn test_descriptions_print_stored_values() {
        let describe = |measurement: Measurement, thresholds: Thresholds| {
            evaluate(&measurement, &thresholds, &source(), at())
                .into_iter()
                .map(|a| a.description)
                .collect::<Vec<_>>()
        };
        assert_eq!(
            describe(Measurement::AirQuality { ppm: 1234.56 }, AIR),
            vec!["Dangerous air quality detected: 1234.56 PPM. Immediate action required."]
        );
        assert_eq!(
            describe(Measurement::TempHumidity { celsius: 40.5, humidity: 85.0 }, CLIMATE),
            vec!["High temperature detected: 40.5°C", "High humidity detected: 85.0%"]
        );
    }

    #[test]
    fn test_record_wire_format() {
        let alert = &evaluate(&Measurement::Distance { cm: 3.0 }, &DISTANCE, &source(), at())[0];
        let json = serde_json::to_value(alert).unwrap();
        assert_eq!(json["AlertType"], "Proximity Alert");
        assert_eq!(json["Failure_x0020_Class"], "Proximity_Warning");
        assert_eq!(json["assetId"], "DIST-SENSOR-01");
        assert_eq!(json["anchor"], "DIST-SENSOR-01");
        assert_eq!(json["App"], APP_NAME);
        assert_eq!(json["Date"], "2025-03-14T09:26:53Z");
        for field in [
            "Report",
            "Stage_x007b__x0023__x007d_",
            "Priority",
            "OperatorNumber",
            "OperatorName",
            "ManagerName",
            "ManagerNumber",
            "GoogleDriveURL",
        ] {
            assert_eq!(json[field], NOT_APPLICABLE, "{} should be a placeholder", field);
        }
    }
}
