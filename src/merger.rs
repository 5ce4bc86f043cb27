// Snapshot merger: folds one fetch outcome into the previous snapshot.
// Pure: no clock reads, no I/O. The caller supplies `now` for the fallback path.

use chrono::{DateTime, Utc};

use crate::error::FetchError;
use crate::fallback::FallbackProvider;
use crate::metrics;
use crate::models::{SourceInfo, StatusPatch, StatusSnapshot};

/// What a merge did to the displayed snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Merged {
    /// A successful patch produced a new snapshot.
    Applied(StatusSnapshot),
    /// No live data was ever received and fallback is enabled.
    Synthetic(StatusSnapshot),
    /// The fetch failed; the previous snapshot stays on display.
    Retained,
}

impl Merged {
    pub fn into_snapshot(self) -> Option<StatusSnapshot> {
        match self {
            Merged::Applied(s) | Merged::Synthetic(s) => Some(s),
            Merged::Retained => None,
        }
    }
}

pub fn merge(
    prev: &StatusSnapshot,
    outcome: &Result<StatusPatch, FetchError>,
    fallback: Option<&FallbackProvider>,
    now: DateTime<Utc>,
) -> Merged {
    match outcome {
        Ok(patch) => Merged::Applied(apply_patch(prev, patch)),
        Err(_) => match fallback {
            Some(provider) if !prev.has_live_data() && !prev.is_synthetic() => {
                let at = prev.timestamp.map_or(now, |ts| ts.max(now));
                Merged::Synthetic(provider.synthetic_snapshot(at))
            }
            _ => Merged::Retained,
        },
    }
}

/// Field-level replacement. Present top-level fields replace wholesale,
/// monitoring sub-documents replace one level deep, absent fields carry over.
/// Synthetic data is never carried into a live snapshot.
pub fn apply_patch(prev: &StatusSnapshot, patch: &StatusPatch) -> StatusSnapshot {
    let base = if prev.is_synthetic() {
        StatusSnapshot::empty()
    } else {
        prev.clone()
    };

    let monitoring_data = match (&base.monitoring_data, &patch.monitoring_data) {
        (Some(old), Some(new)) => Some(old.overlay(new)),
        (old, new) => new.clone().or_else(|| old.clone()),
    };

    let mut next = StatusSnapshot {
        // Monotonic across the aggregator's lifetime, including the synthetic prefix.
        timestamp: prev.timestamp.max(patch.timestamp),
        overall_health: 0,
        system_health: patch.system_health.clone().or(base.system_health),
        agent_statuses: patch.agent_statuses.clone().or(base.agent_statuses),
        active_projects: patch.active_projects.clone().or(base.active_projects),
        monitoring_data,
        capabilities: patch.capabilities.clone().or(base.capabilities),
        source: SourceInfo {
            synthetic: false,
            origin: patch.origin.clone().or(base.source.origin),
            fetched_at: patch.timestamp.max(base.source.fetched_at),
        },
    };
    next.overall_health = metrics::overall_health(next.system_health.as_ref());
    next
}
