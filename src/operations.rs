// One-shot operation triggers (emergency response, daily operations). Outside the polling
// loop; their results reach the snapshot through Aggregator::apply_operation.

use async_trait::async_trait;
use serde_json::json;

use crate::error::FetchError;
use crate::models::{EmergencyRequest, OperationReport};
use crate::transport::{ApiClient, EMERGENCY_PATH};

pub const EMERGENCY_OPERATION: &str = "emergency-response";
pub const DAILY_OPERATIONS: &str = "daily-operations";

#[async_trait]
pub trait OperationsClient: Send + Sync {
    async fn handle_emergency(
        &self,
        request: &EmergencyRequest,
    ) -> Result<OperationReport, FetchError>;

    async fn run_daily_operations(&self, project_name: &str)
    -> Result<OperationReport, FetchError>;
}

#[async_trait]
impl OperationsClient for ApiClient {
    async fn handle_emergency(
        &self,
        request: &EmergencyRequest,
    ) -> Result<OperationReport, FetchError> {
        tracing::info!(
            emergency_type = %request.emergency_type,
            project = %request.project_name,
            "dispatching emergency response"
        );
        let body =
            serde_json::to_value(request).map_err(|e| FetchError::Malformed(e.to_string()))?;
        let response = self.post_json(EMERGENCY_PATH, &body).await?;
        Ok(OperationReport::from_response(EMERGENCY_OPERATION, response))
    }

    async fn run_daily_operations(
        &self,
        project_name: &str,
    ) -> Result<OperationReport, FetchError> {
        tracing::info!(project = %project_name, "running daily operations");
        let url = self.daily_operations_url(project_name)?;
        let response = self.post_url(url, &json!({})).await?;
        Ok(OperationReport::from_response(DAILY_OPERATIONS, response))
    }
}
