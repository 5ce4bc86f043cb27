// Shared test helpers
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use sitepulse::error::FetchError;
use sitepulse::models::{EmergencyRequest, OperationReport, StatusPatch};
use sitepulse::operations::OperationsClient;
use sitepulse::source::StatusSource;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

/// Status payload in the remote's snake_case shape.
pub fn status_payload(agent_performance: f64) -> Value {
    json!({
        "system_health": {
            "overall_health": 12,
            "agent_performance": agent_performance,
            "monitoring_systems": 90,
            "knowledge_base": 88,
            "autonomous_operations": 94
        },
        "agent_statuses": {
            "safety": {
                "status": "active",
                "last_action": "Safety check completed",
                "performance_score": 99,
                "current_tasks": ["PPE compliance", "Hazard identification"]
            },
            "procurement": {
                "status": "active",
                "performance_score": 88,
                "current_tasks": []
            }
        },
        "active_projects": {
            "Downtown Office Complex": {
                "status": "in_progress",
                "progress": "68%",
                "health_score": 92
            }
        },
        "capabilities": { "autonomous_operation": true, "real_time_monitoring": true }
    })
}

pub fn status_patch(agent_performance: f64) -> StatusPatch {
    StatusPatch::from_value(&status_payload(agent_performance))
}

/// Source that replays a script of results. The last entry repeats once the
/// script runs out. Optionally blocks each fetch on a semaphore permit.
#[derive(Debug)]
pub struct ScriptedSource {
    name: String,
    script: Mutex<VecDeque<Result<StatusPatch, FetchError>>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<StatusPatch, FetchError>>) -> Self {
        Self {
            name: "scripted".into(),
            script: Mutex::new(script.into()),
            gate: None,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.into();
        self
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<StatusPatch, FetchError> {
        let mut script = self.script.lock().unwrap();
        match script.len() {
            0 => Err(FetchError::Unavailable("script exhausted".into())),
            1 => script[0].clone(),
            _ => script.pop_front().unwrap(),
        }
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch_status(&self) -> Result<StatusPatch, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let result = self.next();
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Operations client answering with canned responses.
pub struct FakeOperations {
    pub response: Result<Value, FetchError>,
    pub calls: AtomicUsize,
}

impl FakeOperations {
    pub fn answering(response: Value) -> Self {
        Self {
            response: Ok(response),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: FetchError) -> Self {
        Self {
            response: Err(err),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OperationsClient for FakeOperations {
    async fn handle_emergency(
        &self,
        _request: &EmergencyRequest,
    ) -> Result<OperationReport, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.response.clone()?;
        Ok(OperationReport::from_response("emergency-response", body))
    }

    async fn run_daily_operations(
        &self,
        _project_name: &str,
    ) -> Result<OperationReport, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.response.clone()?;
        Ok(OperationReport::from_response("daily-operations", body))
    }
}
