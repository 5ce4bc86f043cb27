// System health sub-scores reported by the agentic backend

use serde::{Deserialize, Serialize};

/// Named sub-scores feeding `overallHealth`. The remote also sends an
/// `overall_health` value; it is ignored and recomputed locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    #[serde(default, alias = "agent_performance", skip_serializing_if = "Option::is_none")]
    pub agent_performance: Option<f64>,
    #[serde(default, alias = "monitoring_systems", skip_serializing_if = "Option::is_none")]
    pub monitoring_systems: Option<f64>,
    #[serde(default, alias = "knowledge_base", skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<f64>,
    #[serde(
        default,
        alias = "autonomous_operations",
        skip_serializing_if = "Option::is_none"
    )]
    pub autonomous_operations: Option<f64>,
}

impl SystemHealth {
    /// Sub-scores in a fixed order: agent performance, monitoring systems,
    /// knowledge base, autonomous operations.
    pub fn sub_scores(&self) -> [(&'static str, Option<f64>); 4] {
        [
            ("agentPerformance", self.agent_performance),
            ("monitoringSystems", self.monitoring_systems),
            ("knowledgeBase", self.knowledge_base),
            ("autonomousOperations", self.autonomous_operations),
        ]
    }
}
