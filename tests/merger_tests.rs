// Snapshot merger tests: field replacement, failure retention, fallback tagging, monotonic time

mod common;

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use sitepulse::error::FetchError;
use sitepulse::fallback::FallbackProvider;
use sitepulse::merger::{Merged, apply_patch, merge};
use sitepulse::models::{StatusPatch, StatusSnapshot};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

fn live_snapshot() -> StatusSnapshot {
    apply_patch(
        &StatusSnapshot::empty(),
        &common::status_patch(95.0).with_timestamp(t0()),
    )
}

#[test]
fn test_partial_agent_update_keeps_other_fields() {
    let prev = live_snapshot();
    assert_eq!(prev.overall_health, 92);
    let patch = StatusPatch::from_value(&json!({
        "agent_statuses": {
            "safety": { "status": "active", "performance_score": 80 }
        }
    }))
    .with_timestamp(t0() + Duration::seconds(10));

    let next = apply_patch(&prev, &patch);

    let agents = next.agent_statuses.as_ref().unwrap();
    assert_eq!(agents["safety"].performance_score, Some(80.0));
    assert_eq!(next.overall_health, 92);
    assert_eq!(next.system_health, prev.system_health);
    assert_eq!(next.active_projects, prev.active_projects);
    assert_eq!(next.capabilities, prev.capabilities);
    assert_eq!(next.monitoring_data, prev.monitoring_data);
}

#[test]
fn test_agent_map_is_replaced_wholesale() {
    let prev = live_snapshot();
    let patch = StatusPatch::from_value(&json!({
        "agent_statuses": { "safety": { "status": "active" } }
    }));
    let next = apply_patch(&prev, &patch);
    let agents = next.agent_statuses.unwrap();
    assert_eq!(agents.len(), 1);
    assert!(!agents.contains_key("procurement"));
}

#[test]
fn test_applying_same_patch_twice_is_idempotent() {
    let patch = common::status_patch(95.0).with_timestamp(t0());
    let once = apply_patch(&StatusSnapshot::empty(), &patch);
    let twice = apply_patch(&once, &patch);
    assert_eq!(once, twice);
}

#[test]
fn test_failure_retains_previous_snapshot() {
    let prev = live_snapshot();
    let merged = merge(&prev, &Err(FetchError::Timeout), None, t0());
    assert_eq!(merged, Merged::Retained);
    assert!(merged.into_snapshot().is_none());
}

#[test]
fn test_failure_with_live_data_never_substitutes_synthetic() {
    let prev = live_snapshot();
    let merged = merge(
        &prev,
        &Err(FetchError::Network("reset".into())),
        Some(&FallbackProvider),
        t0() + Duration::seconds(5),
    );
    assert_eq!(merged, Merged::Retained);
}

#[test]
fn test_first_failure_without_fallback_keeps_empty_snapshot() {
    let merged = merge(
        &StatusSnapshot::empty(),
        &Err(FetchError::Timeout),
        None,
        t0(),
    );
    assert_eq!(merged, Merged::Retained);
}

#[test]
fn test_first_failure_with_fallback_yields_tagged_synthetic() {
    let merged = merge(
        &StatusSnapshot::empty(),
        &Err(FetchError::Timeout),
        Some(&FallbackProvider),
        t0(),
    );
    let Merged::Synthetic(snapshot) = merged else {
        panic!("expected synthetic snapshot, got {merged:?}");
    };
    assert!(snapshot.source.synthetic);
    assert_eq!(snapshot.source.origin.as_deref(), Some("synthetic-fallback"));
    assert_eq!(snapshot.timestamp, Some(t0()));
    assert!(!snapshot.has_live_data());
}

#[test]
fn test_repeated_failure_keeps_existing_synthetic() {
    let synthetic = FallbackProvider.synthetic_snapshot(t0());
    let merged = merge(
        &synthetic,
        &Err(FetchError::Timeout),
        Some(&FallbackProvider),
        t0() + Duration::seconds(10),
    );
    assert_eq!(merged, Merged::Retained);
}

#[test]
fn test_live_result_replaces_synthetic_entirely() {
    let synthetic = FallbackProvider.synthetic_snapshot(t0());
    assert!(synthetic.capabilities.is_some());
    assert!(synthetic.monitoring_data.is_some());

    let patch = StatusPatch::from_value(&json!({
        "system_health": { "agent_performance": 70 }
    }))
    .with_timestamp(t0() + Duration::seconds(1));
    let next = apply_patch(&synthetic, &patch);

    assert!(!next.source.synthetic);
    assert!(next.has_live_data());
    assert!(next.capabilities.is_none());
    assert!(next.monitoring_data.is_none());
    assert!(next.agent_statuses.is_none());
    assert_eq!(next.overall_health, 70);
}

#[test]
fn test_timestamp_never_moves_backwards() {
    let prev = live_snapshot();
    let older = StatusPatch::from_value(&json!({ "capabilities": { "x": true } }))
        .with_timestamp(t0() - Duration::minutes(5));
    let next = apply_patch(&prev, &older);
    assert_eq!(next.timestamp, Some(t0()));
    assert_eq!(next.capabilities.unwrap()["x"], true);
}

#[test]
fn test_monitoring_sub_documents_merge_independently() {
    let prev = apply_patch(
        &StatusSnapshot::empty(),
        &StatusPatch::from_value(&json!({
            "monitoring_data": {
                "weather_data": { "current_temperature": 72, "conditions": "Partly Cloudy" },
                "safety_status": { "incidents_today": 0, "safety_score": 94 }
            }
        })),
    );
    let patch = StatusPatch::from_value(&json!({
        "monitoring_data": {
            "safety_status": { "incidents_today": 2, "safety_score": 70 }
        }
    }));
    let next = apply_patch(&prev, &patch);
    let monitoring = next.monitoring_data.unwrap();
    assert_eq!(
        monitoring.weather_data.unwrap().conditions.as_deref(),
        Some("Partly Cloudy")
    );
    assert_eq!(monitoring.safety_status.unwrap().incidents_today, Some(2));
}

#[test]
fn test_remote_overall_health_is_ignored() {
    let snapshot = live_snapshot();
    // Payload says 12; sub-scores average to 92.
    assert_eq!(snapshot.overall_health, 92);
}

#[test]
fn test_interleaved_results_only_reflect_successes() {
    let outcomes = vec![
        Err(FetchError::Timeout),
        Ok(common::status_patch(95.0).with_timestamp(t0())),
        Err(FetchError::Http { status: 503 }),
        Ok(StatusPatch::from_value(&json!({ "capabilities": { "offline_mode": false } }))
            .with_timestamp(t0() + Duration::seconds(10))),
        Err(FetchError::Malformed("bad json".into())),
    ];
    let mut snapshot = StatusSnapshot::empty();
    let mut expected = StatusSnapshot::empty();
    for outcome in &outcomes {
        if let Some(next) = merge(&snapshot, outcome, None, t0()).into_snapshot() {
            snapshot = next;
        }
        if let Ok(patch) = outcome {
            expected = apply_patch(&expected, patch);
        }
        assert_eq!(snapshot, expected);
    }
    assert_eq!(snapshot.overall_health, 92);
    assert_eq!(snapshot.capabilities.unwrap().len(), 1);
}
