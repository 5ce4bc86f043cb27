// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum_test::TestServer;
use common::{FakeOperations, ScriptedSource};
use serde_json::{Value, json};
use sitepulse::aggregator::Aggregator;
use sitepulse::error::FetchError;
use sitepulse::fallback::FallbackProvider;
use sitepulse::routes;
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn test_app(
    script: Vec<Result<sitepulse::models::StatusPatch, FetchError>>,
    operations: FakeOperations,
) -> (axum::Router, Arc<Aggregator>, Arc<ScriptedSource>) {
    let source = Arc::new(ScriptedSource::new(script));
    let aggregator = Aggregator::new(source.clone(), Some(FallbackProvider));
    let app = routes::app(aggregator.clone(), Arc::new(operations));
    (app, aggregator, source)
}

fn ok_app() -> (axum::Router, Arc<Aggregator>, Arc<ScriptedSource>) {
    test_app(
        vec![Ok(common::status_patch(95.0))],
        FakeOperations::answering(json!({ "success": true })),
    )
}

/// Build TestServer with http_transport (required for WebSocket tests).
fn test_server_with_http(app: axum::Router) -> TestServer {
    TestServer::builder().http_transport().build(app).unwrap()
}

#[tokio::test]
async fn test_version_endpoint() {
    let (app, _, _) = ok_app();
    let server = TestServer::new(app).unwrap();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("sitepulse")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_status_starts_empty() {
    let (app, _, source) = ok_app();
    let server = TestServer::new(app).unwrap();
    let response = server.get("/api/status").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["snapshot"]["overallHealth"], 0);
    assert_eq!(json["derived"]["health"]["band"], "critical");
    assert_eq!(json["isRefreshing"], false);
    assert_eq!(json["stale"], false);
    assert!(json["lastError"].is_null());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_refresh_endpoint_returns_merged_view() {
    let (app, _, source) = ok_app();
    let server = TestServer::new(app).unwrap();
    let response = server.post("/api/status/refresh").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["snapshot"]["overallHealth"], 92);
    assert_eq!(json["derived"]["health"]["label"], "Good");
    assert_eq!(json["derived"]["projects"]["averageProgress"], 68.0);
    assert_eq!(source.calls(), 1);

    let health: Value = server.get("/api/status/health").await.json();
    assert_eq!(health["overallHealth"], 92);
    assert_eq!(health["color"], "#20c997");
    assert_eq!(health["synthetic"], false);
}

#[tokio::test]
async fn test_failed_refresh_shows_synthetic_and_error() {
    let (app, _, _) = test_app(
        vec![Err(FetchError::Timeout)],
        FakeOperations::answering(json!({})),
    );
    let server = TestServer::new(app).unwrap();
    let json: Value = server.post("/api/status/refresh").await.json();
    assert_eq!(json["snapshot"]["source"]["synthetic"], true);
    assert_eq!(json["derived"]["synthetic"], true);
    assert_eq!(json["stale"], true);
    assert_eq!(json["lastError"]["kind"], "transient");
    assert_eq!(json["lastError"]["consecutiveFailures"], 1);
}

#[tokio::test]
async fn test_emergency_endpoint_applies_status_and_refreshes() {
    let operations = FakeOperations::answering(json!({
        "success": true,
        "message": "Emergency protocols activated",
        "system_status": {
            "capabilities": { "emergency_mode": true }
        }
    }));
    let (app, aggregator, _) = test_app(vec![Ok(common::status_patch(95.0))], operations);
    let server = TestServer::new(app).unwrap();

    let response = server
        .post("/api/agentic/emergency-response")
        .json(&json!({
            "emergency_type": "equipment_failure",
            "project_name": "Downtown Office Complex",
            "description": "Crane hydraulic leak"
        }))
        .await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["operation"], "emergency-response");
    assert_eq!(json["statusApplied"], true);

    let snapshot = aggregator.refresh_now().await;
    assert!(snapshot.capabilities.is_some());
    assert!(!snapshot.is_synthetic());
}

#[tokio::test]
async fn test_daily_operations_endpoint() {
    let (app, _, _) = ok_app();
    let server = TestServer::new(app).unwrap();
    let response = server
        .post("/api/agentic/daily-operations/Downtown%20Office%20Complex")
        .await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["operation"], "daily-operations");
    assert_eq!(json["success"], true);
    assert_eq!(json["statusApplied"], false);
}

#[tokio::test]
async fn test_operation_errors_map_to_status_codes() {
    let operations = FakeOperations::failing(FetchError::Unauthorized);
    let (app, _, _) = test_app(vec![Ok(common::status_patch(95.0))], operations);
    let server = TestServer::new(app).unwrap();
    let response = server
        .post("/api/agentic/daily-operations/Villa")
        .expect_failure()
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["kind"], "unauthorized");

    let operations = FakeOperations::failing(FetchError::Http { status: 500 });
    let (app, _, _) = test_app(vec![Ok(common::status_patch(95.0))], operations);
    let server = TestServer::new(app).unwrap();
    server
        .post("/api/agentic/daily-operations/Villa")
        .expect_failure()
        .await
        .assert_status(axum::http::StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_emergency_rejects_missing_fields() {
    let operations = FakeOperations::answering(json!({}));
    let (app, _, _) = test_app(vec![], operations);
    let server = TestServer::new(app).unwrap();
    let response = server
        .post("/api/agentic/emergency-response")
        .json(&json!({ "description": "no type" }))
        .expect_failure()
        .await;
    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_operation_call_count() {
    let operations = Arc::new(FakeOperations::answering(json!({ "success": true })));
    let source = Arc::new(ScriptedSource::new(vec![Ok(common::status_patch(95.0))]));
    let aggregator = Aggregator::new(source, None);
    let app = routes::app(aggregator, operations.clone());
    let server = TestServer::new(app).unwrap();
    server
        .post("/api/agentic/daily-operations/Villa")
        .await
        .assert_status_ok();
    assert_eq!(operations.calls.load(Ordering::SeqCst), 1);
}

// --- WebSocket message tests (require http_transport + ws feature) ---
// Receive until we get valid JSON (server may send Ping first).

async fn receive_first_json_text<T: serde::de::DeserializeOwned>(
    ws: &mut axum_test::TestWebSocket,
) -> T {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<T>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn test_ws_status_sends_current_view_on_connect() {
    let (app, _, _) = ok_app();
    let server = test_server_with_http(app);
    let mut ws = server
        .get_websocket("/ws/status")
        .await
        .into_websocket()
        .await;
    let view: Value = receive_first_json_text(&mut ws).await;
    assert_eq!(view["snapshot"]["overallHealth"], 0);
    assert!(view.get("derived").is_some());
}

#[tokio::test]
async fn test_ws_status_pushes_new_snapshots() {
    let (app, aggregator, _) = ok_app();
    let server = test_server_with_http(app);
    let mut ws = server
        .get_websocket("/ws/status")
        .await
        .into_websocket()
        .await;
    let initial: Value = receive_first_json_text(&mut ws).await;
    assert_eq!(initial["snapshot"]["overallHealth"], 0);

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        aggregator.refresh_now().await;
    });
    let pushed: Value = receive_first_json_text(&mut ws).await;
    assert_eq!(pushed["snapshot"]["overallHealth"], 92);
    assert_eq!(pushed["derived"]["agents"]["total"], 2);
}
