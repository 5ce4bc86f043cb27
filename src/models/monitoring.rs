// Site telemetry sub-documents (cameras, sensors, equipment, workforce, safety, weather, materials)

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraAnalysis {
    #[serde(default, alias = "total_cameras", skip_serializing_if = "Option::is_none")]
    pub total_cameras: Option<u32>,
    #[serde(default, alias = "active_cameras", skip_serializing_if = "Option::is_none")]
    pub active_cameras: Option<u32>,
    #[serde(default)]
    pub analyses: Vec<CameraFeed>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraFeed {
    #[serde(alias = "camera_id")]
    pub camera_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<FeedAnalysis>,
    #[serde(default)]
    pub alerts: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedAnalysis {
    #[serde(default, alias = "workers_detected", skip_serializing_if = "Option::is_none")]
    pub workers_detected: Option<WorkersDetected>,
    #[serde(default, alias = "equipment_detected", skip_serializing_if = "Option::is_none")]
    pub equipment_detected: Option<EquipmentDetected>,
    #[serde(default, alias = "safety_violations")]
    pub safety_violations: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkersDetected {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub activities: Vec<String>,
    /// PPE item -> number of workers wearing it.
    #[serde(default, alias = "safety_compliance")]
    pub safety_compliance: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentDetected {
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub idle: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, alias = "noise_level", skip_serializing_if = "Option::is_none")]
    pub noise_level: Option<f64>,
    #[serde(default, alias = "air_quality", skip_serializing_if = "Option::is_none")]
    pub air_quality: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    #[serde(default, alias = "current_temperature", skip_serializing_if = "Option::is_none")]
    pub current_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, alias = "wind_speed", skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentStatus {
    #[serde(default, alias = "total_equipment", skip_serializing_if = "Option::is_none")]
    pub total_equipment: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<u32>,
    #[serde(default, alias = "maintenance_needed", skip_serializing_if = "Option::is_none")]
    pub maintenance_needed: Option<u32>,
    #[serde(default, alias = "equipment_list")]
    pub equipment_list: Vec<EquipmentItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerActivities {
    #[serde(default, alias = "total_workers", skip_serializing_if = "Option::is_none")]
    pub total_workers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<u32>,
    #[serde(default, alias = "on_break", skip_serializing_if = "Option::is_none")]
    pub on_break: Option<u32>,
    #[serde(default, alias = "productivity_score", skip_serializing_if = "Option::is_none")]
    pub productivity_score: Option<f64>,
    /// Zone name -> worker count.
    #[serde(default)]
    pub zones: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyStatus {
    #[serde(default, alias = "incidents_today", skip_serializing_if = "Option::is_none")]
    pub incidents_today: Option<u32>,
    #[serde(default, alias = "safety_score", skip_serializing_if = "Option::is_none")]
    pub safety_score: Option<f64>,
    #[serde(default, alias = "compliance_rate", skip_serializing_if = "Option::is_none")]
    pub compliance_rate: Option<f64>,
    #[serde(default)]
    pub violations: Vec<Value>,
    #[serde(default, alias = "last_inspection", skip_serializing_if = "Option::is_none")]
    pub last_inspection: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialLevel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Nested telemetry. Every sub-document is owned by the most recent fetch
/// that carried it; absent sub-documents keep their previous value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringData {
    #[serde(default, alias = "camera_analysis", skip_serializing_if = "Option::is_none")]
    pub camera_analysis: Option<CameraAnalysis>,
    #[serde(default, alias = "sensor_data", skip_serializing_if = "Option::is_none")]
    pub sensor_data: Option<SensorData>,
    #[serde(default, alias = "equipment_status", skip_serializing_if = "Option::is_none")]
    pub equipment_status: Option<EquipmentStatus>,
    #[serde(default, alias = "worker_activities", skip_serializing_if = "Option::is_none")]
    pub worker_activities: Option<WorkerActivities>,
    #[serde(default, alias = "safety_status", skip_serializing_if = "Option::is_none")]
    pub safety_status: Option<SafetyStatus>,
    #[serde(default, alias = "weather_data", skip_serializing_if = "Option::is_none")]
    pub weather_data: Option<WeatherData>,
    #[serde(default, alias = "material_levels", skip_serializing_if = "Option::is_none")]
    pub material_levels: Option<BTreeMap<String, MaterialLevel>>,
}

impl MonitoringData {
    /// Decode sub-documents one at a time. A sub-document that fails to
    /// decode is left absent and its key is returned in the second element.
    pub fn from_value(value: &Value) -> (Self, Vec<String>) {
        let mut malformed = Vec::new();
        let Some(obj) = value.as_object() else {
            malformed.push("monitoring_data".to_string());
            return (Self::default(), malformed);
        };
        let field = |snake: &str, camel: &str| -> Option<Value> {
            obj.get(snake).or_else(|| obj.get(camel)).cloned()
        };
        let data = Self {
            camera_analysis: decode_sub(
                field("camera_analysis", "cameraAnalysis"),
                "camera_analysis",
                &mut malformed,
            ),
            sensor_data: decode_sub(
                field("sensor_data", "sensorData"),
                "sensor_data",
                &mut malformed,
            ),
            equipment_status: decode_sub(
                field("equipment_status", "equipmentStatus"),
                "equipment_status",
                &mut malformed,
            ),
            worker_activities: decode_sub(
                field("worker_activities", "workerActivities"),
                "worker_activities",
                &mut malformed,
            ),
            safety_status: decode_sub(
                field("safety_status", "safetyStatus"),
                "safety_status",
                &mut malformed,
            ),
            weather_data: decode_sub(
                field("weather_data", "weatherData"),
                "weather_data",
                &mut malformed,
            ),
            material_levels: decode_sub(
                field("material_levels", "materialLevels"),
                "material_levels",
                &mut malformed,
            ),
        };
        (data, malformed)
    }

    /// Sub-documents present in `newer` replace ours wholesale.
    pub fn overlay(&self, newer: &MonitoringData) -> MonitoringData {
        MonitoringData {
            camera_analysis: newer
                .camera_analysis
                .clone()
                .or_else(|| self.camera_analysis.clone()),
            sensor_data: newer.sensor_data.clone().or_else(|| self.sensor_data.clone()),
            equipment_status: newer
                .equipment_status
                .clone()
                .or_else(|| self.equipment_status.clone()),
            worker_activities: newer
                .worker_activities
                .clone()
                .or_else(|| self.worker_activities.clone()),
            safety_status: newer
                .safety_status
                .clone()
                .or_else(|| self.safety_status.clone()),
            weather_data: newer
                .weather_data
                .clone()
                .or_else(|| self.weather_data.clone()),
            material_levels: newer
                .material_levels
                .clone()
                .or_else(|| self.material_levels.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == MonitoringData::default()
    }
}

fn decode_sub<T: DeserializeOwned>(
    value: Option<Value>,
    key: &str,
    malformed: &mut Vec<String>,
) -> Option<T> {
    match value {
        None | Some(Value::Null) => None,
        Some(v) => match serde_json::from_value(v) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(field = key, error = %e, "dropping malformed monitoring sub-document");
                malformed.push(format!("monitoring_data.{key}"));
                None
            }
        },
    }
}
