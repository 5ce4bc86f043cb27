// HTTP handlers: version, status reads, refresh and operation triggers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::{AppState, StatusView};
use crate::error::FetchError;
use crate::metrics;
use crate::models::{EmergencyRequest, OperationReport};
use crate::version::{NAME, VERSION};

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/status: current snapshot, derived view and error side channel.
pub(super) async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusView::capture(&state.aggregator))
}

/// GET /api/status/health: compact health badge for headers and probes.
pub(super) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.aggregator.current_snapshot();
    let health = metrics::health_summary(&snapshot);
    Json(json!({
        "overallHealth": health.overall,
        "label": health.label,
        "cssClass": health.css_class,
        "color": health.color,
        "timestamp": snapshot.timestamp,
        "synthetic": snapshot.is_synthetic(),
        "isRefreshing": state.aggregator.is_refreshing(),
        "lastError": state.aggregator.last_error(),
    }))
}

/// POST /api/status/refresh: out-of-cycle refresh; joins a cycle already in flight.
pub(super) async fn refresh_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.aggregator.refresh_now().await;
    Json(StatusView::of(&state.aggregator, snapshot))
}

/// POST /api/agentic/emergency-response
pub(super) async fn emergency_handler(
    State(state): State<AppState>,
    Json(request): Json<EmergencyRequest>,
) -> Response {
    let operations = state.operations.clone();
    let result = state
        .aggregator
        .apply_operation(async move { operations.handle_emergency(&request).await })
        .await;
    state.aggregator.trigger();
    operation_response(result)
}

/// POST /api/agentic/daily-operations/{project}
pub(super) async fn daily_operations_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Response {
    let operations = state.operations.clone();
    let result = state
        .aggregator
        .apply_operation(async move { operations.run_daily_operations(&project).await })
        .await;
    state.aggregator.trigger();
    operation_response(result)
}

fn operation_response(result: Result<OperationReport, FetchError>) -> Response {
    match result {
        Ok(report) => Json(json!({
            "operation": report.operation,
            "success": report.success,
            "message": report.message,
            "statusApplied": !report.patch.is_empty(),
            "response": report.response,
        }))
        .into_response(),
        Err(e) => {
            let status = match e {
                FetchError::Unauthorized => StatusCode::UNAUTHORIZED,
                FetchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(json!({
                    "success": false,
                    "kind": e.kind(),
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
