// Per-agent status entries and per-project status entries

use serde::{Deserialize, Deserializer, Serialize};

/// One agent's status. `status` is required: entries without it are dropped
/// on ingest instead of being stored as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub status: String,
    #[serde(default, alias = "last_action", skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
    #[serde(default, alias = "performance_score", skip_serializing_if = "Option::is_none")]
    pub performance_score: Option<f64>,
    #[serde(default, alias = "current_tasks")]
    pub current_tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    pub status: String,
    /// Accepts a number or a percent string such as `"68%"`.
    #[serde(
        default,
        alias = "progress",
        alias = "progress_percent",
        deserialize_with = "deserialize_percent",
        skip_serializing_if = "Option::is_none"
    )]
    pub progress_percent: Option<f64>,
    #[serde(default, alias = "health_score", skip_serializing_if = "Option::is_none")]
    pub health_score: Option<f64>,
    #[serde(default, alias = "last_update", skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PercentRepr {
    Number(f64),
    Text(String),
}

fn deserialize_percent<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<PercentRepr>::deserialize(deserializer)?;
    Ok(match repr {
        Some(PercentRepr::Number(n)) => Some(n),
        Some(PercentRepr::Text(s)) => s.trim().trim_end_matches('%').trim().parse().ok(),
        None => None,
    })
}
