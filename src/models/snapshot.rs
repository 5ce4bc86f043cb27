// Aggregate status snapshot and the partial patch produced by one fetch

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{AgentStatus, MonitoringData, ProjectStatus, SystemHealth};

/// Top-level patch fields a source may own wholesale (remote snake_case names).
pub const PATCH_FIELDS: [&str; 5] = [
    "system_health",
    "agent_statuses",
    "active_projects",
    "monitoring_data",
    "capabilities",
];

/// Where the data in a snapshot came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    /// True only for locally generated placeholder data.
    pub synthetic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// One immutable view of system status. Produced only by the merger and the
/// fallback provider; `overall_health` is always derived from `system_health`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub overall_health: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_health: Option<SystemHealth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_statuses: Option<BTreeMap<String, AgentStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_projects: Option<BTreeMap<String, ProjectStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_data: Option<MonitoringData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<BTreeMap<String, bool>>,
    #[serde(default)]
    pub source: SourceInfo,
}

impl StatusSnapshot {
    /// The snapshot an aggregator starts with: every optional field absent.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_synthetic(&self) -> bool {
        self.source.synthetic
    }

    /// True once at least one live result has been merged in.
    pub fn has_live_data(&self) -> bool {
        !self.source.synthetic && self.timestamp.is_some()
    }
}

/// Partial snapshot from one fetch. `None` means "not carried by this
/// fetch", so the previous value survives the merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusPatch {
    pub timestamp: Option<DateTime<Utc>>,
    pub system_health: Option<SystemHealth>,
    pub agent_statuses: Option<BTreeMap<String, AgentStatus>>,
    pub active_projects: Option<BTreeMap<String, ProjectStatus>>,
    pub monitoring_data: Option<MonitoringData>,
    pub capabilities: Option<BTreeMap<String, bool>>,
    pub origin: Option<String>,
    /// Fields (dotted paths) dropped because they failed to decode.
    pub malformed: Vec<String>,
    /// Names of sources that failed while others in the same cycle succeeded.
    pub failed_sources: Vec<String>,
}

impl StatusPatch {
    /// Decode a remote status payload field by field. Unknown keys are
    /// ignored; a field that fails to decode is treated as absent.
    pub fn from_value(value: &Value) -> Self {
        let mut patch = Self::default();
        let Some(obj) = value.as_object() else {
            tracing::warn!("status payload is not a JSON object; ignoring");
            patch.malformed.push("<root>".to_string());
            return patch;
        };
        let get = |snake: &str, camel: &str| obj.get(snake).or_else(|| obj.get(camel));

        patch.system_health = decode_field(
            get("system_health", "systemHealth"),
            "system_health",
            &mut patch.malformed,
        );
        patch.agent_statuses = decode_entries(
            get("agent_statuses", "agentStatuses"),
            "agent_statuses",
            &mut patch.malformed,
        );
        patch.active_projects = decode_entries(
            get("active_projects", "activeProjects"),
            "active_projects",
            &mut patch.malformed,
        );
        patch.capabilities = decode_field(
            get("capabilities", "capabilities"),
            "capabilities",
            &mut patch.malformed,
        );
        if let Some(raw) = get("monitoring_data", "monitoringData").filter(|v| !v.is_null()) {
            let (data, malformed) = MonitoringData::from_value(raw);
            patch.malformed.extend(malformed);
            if !data.is_empty() {
                patch.monitoring_data = Some(data);
            }
        }
        patch
    }

    /// Build a patch from a body that represents exactly one top-level field,
    /// e.g. a dedicated monitoring endpoint returning `monitoring_data` only.
    pub fn from_field_value(field: &str, body: Value) -> Self {
        let mut wrapper = serde_json::Map::new();
        wrapper.insert(field.to_string(), body);
        Self::from_value(&Value::Object(wrapper))
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// True when the patch carries no status field at all.
    pub fn is_empty(&self) -> bool {
        self.system_health.is_none()
            && self.agent_statuses.is_none()
            && self.active_projects.is_none()
            && self.monitoring_data.is_none()
            && self.capabilities.is_none()
    }

    /// Combine two patches from the same cycle; fields in `newer` win.
    /// Monitoring sub-documents combine one level deep.
    pub fn overlay(self, newer: StatusPatch) -> StatusPatch {
        let monitoring_data = match (self.monitoring_data, newer.monitoring_data) {
            (Some(old), Some(new)) => Some(old.overlay(&new)),
            (old, new) => new.or(old),
        };
        let origin = match (self.origin, newer.origin) {
            (Some(a), Some(b)) if a != b => Some(format!("{a}+{b}")),
            (a, b) => b.or(a),
        };
        let mut malformed = self.malformed;
        malformed.extend(newer.malformed);
        let mut failed_sources = self.failed_sources;
        failed_sources.extend(newer.failed_sources);
        StatusPatch {
            timestamp: self.timestamp.max(newer.timestamp),
            system_health: newer.system_health.or(self.system_health),
            agent_statuses: newer.agent_statuses.or(self.agent_statuses),
            active_projects: newer.active_projects.or(self.active_projects),
            monitoring_data,
            capabilities: newer.capabilities.or(self.capabilities),
            origin,
            malformed,
            failed_sources,
        }
    }
}

fn decode_field<T: DeserializeOwned>(
    value: Option<&Value>,
    key: &str,
    malformed: &mut Vec<String>,
) -> Option<T> {
    match value {
        None | Some(Value::Null) => None,
        Some(v) => match serde_json::from_value(v.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(field = key, error = %e, "dropping malformed status field");
                malformed.push(key.to_string());
                None
            }
        },
    }
}

/// Decode a keyed map entry by entry. Null entries and entries without a
/// usable `status` are omitted rather than stored.
fn decode_entries<T: DeserializeOwned>(
    value: Option<&Value>,
    key: &str,
    malformed: &mut Vec<String>,
) -> Option<BTreeMap<String, T>> {
    let value = match value {
        None | Some(Value::Null) => return None,
        Some(v) => v,
    };
    let Some(obj) = value.as_object() else {
        tracing::warn!(field = key, "expected an object of entries; dropping field");
        malformed.push(key.to_string());
        return None;
    };
    let mut entries = BTreeMap::new();
    for (name, raw) in obj {
        if raw.is_null() {
            continue;
        }
        match serde_json::from_value(raw.clone()) {
            Ok(entry) => {
                entries.insert(name.clone(), entry);
            }
            Err(e) => {
                tracing::debug!(field = key, entry = %name, error = %e, "omitting entry");
                malformed.push(format!("{key}.{name}"));
            }
        }
    }
    Some(entries)
}
