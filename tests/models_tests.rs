// Payload decoding tests: aliases, malformed fields, entry filtering, wire format

mod common;

use serde_json::json;
use sitepulse::models::{
    EmergencyRequest, MonitoringData, OperationReport, StatusPatch, StatusSnapshot,
};

#[test]
fn test_snake_case_payload_decodes() {
    let patch = common::status_patch(95.0);
    assert!(patch.malformed.is_empty());
    let health = patch.system_health.unwrap();
    assert_eq!(health.agent_performance, Some(95.0));
    assert_eq!(health.autonomous_operations, Some(94.0));
    let agents = patch.agent_statuses.unwrap();
    assert_eq!(agents["safety"].current_tasks.len(), 2);
    assert_eq!(
        agents["safety"].last_action.as_deref(),
        Some("Safety check completed")
    );
    let projects = patch.active_projects.unwrap();
    assert_eq!(
        projects["Downtown Office Complex"].progress_percent,
        Some(68.0)
    );
    assert_eq!(patch.capabilities.unwrap().len(), 2);
}

#[test]
fn test_camel_case_aliases_accepted() {
    let patch = StatusPatch::from_value(&json!({
        "systemHealth": { "agentPerformance": 80, "knowledgeBase": 90 },
        "activeProjects": {
            "Villa": { "status": "planning", "progressPercent": 15, "healthScore": 95 }
        }
    }));
    assert_eq!(patch.system_health.unwrap().knowledge_base, Some(90.0));
    assert_eq!(patch.active_projects.unwrap()["Villa"].progress_percent, Some(15.0));
}

#[test]
fn test_malformed_field_is_absent_and_reported() {
    let patch = StatusPatch::from_value(&json!({
        "system_health": "not an object",
        "capabilities": { "autonomous_operation": true }
    }));
    assert!(patch.system_health.is_none());
    assert!(patch.capabilities.is_some());
    assert_eq!(patch.malformed, vec!["system_health".to_string()]);
}

#[test]
fn test_entries_without_status_are_omitted() {
    let patch = StatusPatch::from_value(&json!({
        "agent_statuses": {
            "safety": { "status": "active" },
            "finance": null,
            "quality": { "performance_score": 97 }
        }
    }));
    let agents = patch.agent_statuses.unwrap();
    assert_eq!(agents.len(), 1);
    assert!(agents.contains_key("safety"));
    assert_eq!(patch.malformed, vec!["agent_statuses.quality".to_string()]);
}

#[test]
fn test_null_fields_are_absent() {
    let patch = StatusPatch::from_value(&json!({
        "system_health": null,
        "monitoring_data": null
    }));
    assert!(patch.is_empty());
    assert!(patch.malformed.is_empty());
}

#[test]
fn test_non_object_payload_is_empty_patch() {
    let patch = StatusPatch::from_value(&json!([1, 2, 3]));
    assert!(patch.is_empty());
    assert_eq!(patch.malformed, vec!["<root>".to_string()]);
}

#[test]
fn test_monitoring_sub_documents_decode_independently() {
    let (data, malformed) = MonitoringData::from_value(&json!({
        "weather_data": { "conditions": "Sunny", "wind_speed": 12 },
        "worker_activities": { "total_workers": "many" },
        "material_levels": { "lumber": { "level": 45, "status": "low" } }
    }));
    assert_eq!(data.weather_data.unwrap().wind_speed, Some(12.0));
    assert!(data.worker_activities.is_none());
    assert_eq!(data.material_levels.unwrap()["lumber"].level, Some(45.0));
    assert_eq!(malformed, vec!["monitoring_data.worker_activities".to_string()]);
}

#[test]
fn test_field_source_body_maps_to_one_field() {
    let patch = StatusPatch::from_field_value(
        "monitoring_data",
        json!({ "sensor_data": { "temperature": 28, "noise_level": 78 } }),
    );
    assert!(patch.system_health.is_none());
    let sensors = patch.monitoring_data.unwrap().sensor_data.unwrap();
    assert_eq!(sensors.noise_level, Some(78.0));
}

#[test]
fn test_progress_strings_parse() {
    for (raw, expected) in [
        (json!("68%"), Some(68.0)),
        (json!(" 45 % "), Some(45.0)),
        (json!(12.5), Some(12.5)),
        (json!("unknown"), None),
    ] {
        let patch = StatusPatch::from_value(&json!({
            "active_projects": { "P": { "status": "in_progress", "progress": raw } }
        }));
        assert_eq!(
            patch.active_projects.unwrap()["P"].progress_percent,
            expected
        );
    }
}

#[test]
fn test_patch_overlay_prefers_newer_fields() {
    let older = common::status_patch(95.0).with_origin("a");
    let newer = StatusPatch::from_value(&json!({
        "system_health": { "agent_performance": 50 }
    }))
    .with_origin("b");
    let combined = older.overlay(newer);
    assert_eq!(combined.system_health.unwrap().agent_performance, Some(50.0));
    assert!(combined.agent_statuses.is_some());
    assert_eq!(combined.origin.as_deref(), Some("a+b"));
}

#[test]
fn test_snapshot_serializes_camel_case() {
    let snapshot = sitepulse::merger::apply_patch(&StatusSnapshot::empty(), &common::status_patch(95.0));
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["overallHealth"], 92);
    assert_eq!(value["systemHealth"]["agentPerformance"], 95.0);
    assert_eq!(value["agentStatuses"]["safety"]["performanceScore"], 99.0);
    assert_eq!(
        value["activeProjects"]["Downtown Office Complex"]["progressPercent"],
        68.0
    );
    assert_eq!(value["source"]["synthetic"], false);
    assert!(value.get("timestamp").is_none());
}

#[test]
fn test_emergency_request_wire_format() {
    let request: EmergencyRequest = serde_json::from_value(json!({
        "emergencyType": "equipment_failure",
        "projectName": "Industrial Warehouse"
    }))
    .unwrap();
    assert_eq!(request.description, "");
    let body = serde_json::to_value(&request).unwrap();
    assert_eq!(body["emergency_type"], "equipment_failure");
    assert_eq!(body["project_name"], "Industrial Warehouse");
}

#[test]
fn test_operation_report_reads_nested_system_status() {
    let report = OperationReport::from_response(
        "daily-operations",
        json!({
            "success": false,
            "message": "partial run",
            "systemStatus": { "capabilities": { "autonomous_operation": false } }
        }),
    );
    assert!(!report.success);
    assert_eq!(report.message.as_deref(), Some("partial run"));
    assert!(report.patch.capabilities.is_some());
    assert_eq!(report.patch.origin.as_deref(), Some("daily-operations"));
}

#[test]
fn test_operation_report_without_status_has_empty_patch() {
    let report = OperationReport::from_response("emergency-response", json!({ "ok": 1 }));
    assert!(report.success);
    assert!(report.patch.is_empty());
}
