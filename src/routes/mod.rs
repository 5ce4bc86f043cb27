// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregator::Aggregator;
use crate::error::RefreshError;
use crate::metrics::{self, DerivedView};
use crate::models::StatusSnapshot;
use crate::operations::OperationsClient;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) aggregator: Arc<Aggregator>,
    pub(crate) operations: Arc<dyn OperationsClient>,
}

/// What the console renders: the snapshot, its derived values and the error
/// side channel. `stale` is set while the last refresh failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub snapshot: StatusSnapshot,
    pub derived: DerivedView,
    pub last_error: Option<RefreshError>,
    pub is_refreshing: bool,
    pub stale: bool,
}

impl StatusView {
    pub fn capture(aggregator: &Aggregator) -> Self {
        Self::of(aggregator, aggregator.current_snapshot())
    }

    pub fn of(aggregator: &Aggregator, snapshot: Arc<StatusSnapshot>) -> Self {
        let last_error = aggregator.last_error();
        Self {
            derived: metrics::derive(&snapshot),
            snapshot: snapshot.as_ref().clone(),
            stale: last_error.is_some(),
            last_error,
            is_refreshing: aggregator.is_refreshing(),
        }
    }
}

pub fn app(aggregator: Arc<Aggregator>, operations: Arc<dyn OperationsClient>) -> Router {
    let state = AppState {
        aggregator,
        operations,
    };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/status", get(http::status_handler)) // GET /api/status
        .route("/api/status/health", get(http::health_handler)) // GET /api/status/health
        .route("/api/status/refresh", post(http::refresh_handler)) // POST /api/status/refresh
        .route(
            "/api/agentic/emergency-response",
            post(http::emergency_handler),
        ) // POST /api/agentic/emergency-response
        .route(
            "/api/agentic/daily-operations/{project}",
            post(http::daily_operations_handler),
        ) // POST /api/agentic/daily-operations/{project}
        .route("/ws/status", get(ws::ws_status)) // WS /ws/status
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
