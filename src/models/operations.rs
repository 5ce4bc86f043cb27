// One-shot operation requests (emergency response, daily operations) and their results

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StatusPatch;

/// Body of `POST /api/agentic/emergency-response`. Serialized snake_case for
/// the remote; camelCase is accepted from local callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyRequest {
    #[serde(alias = "emergencyType")]
    pub emergency_type: String,
    #[serde(alias = "projectName")]
    pub project_name: String,
    #[serde(default)]
    pub description: String,
}

/// Result of an operation call. `patch` holds whatever status fields the
/// response carried; it is applied through the merger like a fetch result.
#[derive(Debug, Clone)]
pub struct OperationReport {
    pub operation: &'static str,
    pub success: bool,
    pub message: Option<String>,
    pub response: Value,
    pub patch: StatusPatch,
}

impl OperationReport {
    /// Interpret a remote response body. Status fields may sit at the top
    /// level or under `system_status`.
    pub fn from_response(operation: &'static str, response: Value) -> Self {
        let success = response
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let message = response
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        let status_body = response
            .get("system_status")
            .or_else(|| response.get("systemStatus"))
            .unwrap_or(&response);
        let patch = if status_body.is_object() {
            StatusPatch::from_value(status_body).with_origin(operation)
        } else {
            StatusPatch::default()
        };
        Self {
            operation,
            success,
            message,
            response,
            patch,
        }
    }
}
