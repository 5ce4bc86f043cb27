// Derived, display-ready metrics computed from a snapshot. Pure functions only.

use serde::Serialize;

use crate::models::{
    CameraAnalysis, EquipmentStatus, MonitoringData, SafetyStatus, StatusSnapshot, SystemHealth,
    WorkerActivities,
};

/// Rounded mean of the present, finite sub-scores, clamped to 0..=100.
/// No sub-scores gives 0.
pub fn overall_health(health: Option<&SystemHealth>) -> u8 {
    let Some(health) = health else {
        return 0;
    };
    let scores: Vec<f64> = health
        .sub_scores()
        .into_iter()
        .filter_map(|(_, score)| score)
        .filter(|s| s.is_finite())
        .map(|s| s.clamp(0.0, 100.0))
        .collect();
    if scores.is_empty() {
        return 0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

/// Ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthBand {
    Excellent,
    Good,
    Fair,
    Attention,
    Critical,
}

impl HealthBand {
    /// >=95 excellent, >=85 good, >=75 fair, >=60 attention, else critical.
    /// Non-finite scores are critical.
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            return HealthBand::Critical;
        }
        if score >= 95.0 {
            HealthBand::Excellent
        } else if score >= 85.0 {
            HealthBand::Good
        } else if score >= 75.0 {
            HealthBand::Fair
        } else if score >= 60.0 {
            HealthBand::Attention
        } else {
            HealthBand::Critical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthBand::Excellent => "Excellent",
            HealthBand::Good => "Good",
            HealthBand::Fair => "Fair",
            HealthBand::Attention => "Needs Attention",
            HealthBand::Critical => "Critical",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            HealthBand::Excellent => "health-excellent",
            HealthBand::Good => "health-good",
            HealthBand::Fair => "health-fair",
            HealthBand::Attention => "health-attention",
            HealthBand::Critical => "health-critical",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            HealthBand::Excellent => "#28a745",
            HealthBand::Good => "#20c997",
            HealthBand::Fair => "#ffc107",
            HealthBand::Attention => "#fd7e14",
            HealthBand::Critical => "#dc3545",
        }
    }
}

/// Coarse tone for free-form status strings (agents, projects, equipment, materials).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Healthy,
    Warning,
    Danger,
    Neutral,
}

impl StatusTone {
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "active" | "in_progress" | "good" | "adequate" => StatusTone::Healthy,
            "maintenance" | "planning" | "low" | "warning" => StatusTone::Warning,
            "offline" | "error" | "critical" | "empty" => StatusTone::Danger,
            _ => StatusTone::Neutral,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            StatusTone::Healthy => "#28a745",
            StatusTone::Warning => "#ffc107",
            StatusTone::Danger => "#dc3545",
            StatusTone::Neutral => "#6c757d",
        }
    }
}

/// Share of `part` in `total` as a percentage; 0 when `total` is 0.
pub fn percent_of(part: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(part) / f64::from(total) * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub overall: u8,
    pub band: HealthBand,
    pub label: &'static str,
    pub css_class: &'static str,
    pub color: &'static str,
    pub components: Vec<ScoredComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredComponent {
    pub name: &'static str,
    pub score: f64,
    pub band: HealthBand,
}

pub fn health_summary(snapshot: &StatusSnapshot) -> HealthSummary {
    let overall = overall_health(snapshot.system_health.as_ref());
    let band = HealthBand::from_score(f64::from(overall));
    let components = snapshot
        .system_health
        .as_ref()
        .map(|h| {
            h.sub_scores()
                .into_iter()
                .filter_map(|(name, score)| score.map(|s| (name, s)))
                .map(|(name, score)| ScoredComponent {
                    name,
                    score,
                    band: HealthBand::from_score(score),
                })
                .collect()
        })
        .unwrap_or_default();
    HealthSummary {
        overall,
        band,
        label: band.label(),
        css_class: band.css_class(),
        color: band.color(),
        components,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneShare {
    pub zone: String,
    pub count: u32,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkforceSummary {
    pub total_workers: u32,
    pub active: u32,
    pub on_break: u32,
    pub active_percent: f64,
    pub productivity_score: f64,
    pub zones: Vec<ZoneShare>,
}

/// Zone shares use `totalWorkers` as the denominator; a zero total renders
/// every zone as 0%.
pub fn workforce_summary(workers: Option<&WorkerActivities>) -> WorkforceSummary {
    let Some(w) = workers else {
        return WorkforceSummary::default();
    };
    let total = w.total_workers.unwrap_or(0);
    let active = w.active.unwrap_or(0);
    WorkforceSummary {
        total_workers: total,
        active,
        on_break: w.on_break.unwrap_or(0),
        active_percent: percent_of(active, total),
        productivity_score: w.productivity_score.filter(|s| s.is_finite()).unwrap_or(0.0),
        zones: w
            .zones
            .iter()
            .map(|(zone, &count)| ZoneShare {
                zone: zone.clone(),
                count,
                percent: percent_of(count, total),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentSummary {
    pub total: u32,
    pub active: u32,
    pub maintenance_needed: u32,
    pub tracked: u32,
    pub average_health: f64,
    pub needs_attention: Vec<String>,
}

/// Declared totals win over list-derived counts when the remote sends both.
pub fn equipment_summary(equipment: Option<&EquipmentStatus>) -> EquipmentSummary {
    let Some(e) = equipment else {
        return EquipmentSummary::default();
    };
    let tracked = e.equipment_list.len() as u32;
    let listed_active = e
        .equipment_list
        .iter()
        .filter(|i| i.status.as_deref().map(StatusTone::from_status) == Some(StatusTone::Healthy))
        .count() as u32;
    let listed_maintenance = e
        .equipment_list
        .iter()
        .filter(|i| i.status.as_deref() == Some("maintenance"))
        .count() as u32;
    let healths: Vec<f64> = e
        .equipment_list
        .iter()
        .filter_map(|i| i.health)
        .filter(|h| h.is_finite())
        .collect();
    let needs_attention = e
        .equipment_list
        .iter()
        .filter(|i| {
            i.health.is_some_and(|h| HealthBand::from_score(h) >= HealthBand::Attention)
                || i.status
                    .as_deref()
                    .is_some_and(|s| StatusTone::from_status(s) != StatusTone::Healthy)
        })
        .map(|i| i.id.clone())
        .collect();
    EquipmentSummary {
        total: e.total_equipment.unwrap_or(tracked),
        active: e.active.unwrap_or(listed_active),
        maintenance_needed: e.maintenance_needed.unwrap_or(listed_maintenance),
        tracked,
        average_health: mean(&healths),
        needs_attention,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetySummary {
    pub incidents_today: u32,
    pub safety_score: f64,
    pub compliance_rate: f64,
    pub open_violations: u32,
    pub band: HealthBand,
    pub all_clear: bool,
}

pub fn safety_summary(
    safety: Option<&SafetyStatus>,
    cameras: Option<&CameraAnalysis>,
) -> SafetySummary {
    let camera_violations: usize = cameras
        .map(|c| {
            c.analyses
                .iter()
                .filter_map(|f| f.analysis.as_ref())
                .map(|a| a.safety_violations.len())
                .sum()
        })
        .unwrap_or(0);
    let incidents_today = safety.and_then(|s| s.incidents_today).unwrap_or(0);
    let safety_score = safety
        .and_then(|s| s.safety_score)
        .filter(|s| s.is_finite())
        .unwrap_or(0.0);
    let open_violations = saturating_u32(
        safety
            .map(|s| s.violations.len())
            .unwrap_or(0)
            .saturating_add(camera_violations),
    );
    SafetySummary {
        incidents_today,
        safety_score,
        compliance_rate: safety
            .and_then(|s| s.compliance_rate)
            .filter(|s| s.is_finite())
            .unwrap_or(0.0),
        open_violations,
        band: HealthBand::from_score(safety_score),
        all_clear: incidents_today == 0 && open_violations == 0,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSummary {
    pub total_cameras: u32,
    pub active_cameras: u32,
    pub online_percent: f64,
    pub workers_detected: u32,
    pub equipment_active: u32,
    pub compliant_feeds: u32,
    pub feeds_with_violations: u32,
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

pub fn camera_summary(cameras: Option<&CameraAnalysis>) -> CameraSummary {
    let Some(c) = cameras else {
        return CameraSummary::default();
    };
    let feeds = c.analyses.len() as u32;
    let total = c.total_cameras.unwrap_or(feeds);
    let active = c.active_cameras.unwrap_or(feeds);
    let mut summary = CameraSummary {
        total_cameras: total,
        active_cameras: active,
        online_percent: percent_of(active, total),
        ..Default::default()
    };
    // Counts come straight from the remote; totals saturate instead of wrapping.
    for analysis in c.analyses.iter().filter_map(|f| f.analysis.as_ref()) {
        let workers = analysis.workers_detected.as_ref().map_or(0, |w| w.count);
        let equipment = analysis
            .equipment_detected
            .as_ref()
            .map_or(0, |e| saturating_u32(e.active.len()));
        summary.workers_detected = summary.workers_detected.saturating_add(workers);
        summary.equipment_active = summary.equipment_active.saturating_add(equipment);
        if analysis.safety_violations.is_empty() {
            summary.compliant_feeds += 1;
        } else {
            summary.feeds_with_violations += 1;
        }
    }
    summary
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub total: u32,
    pub active: u32,
    pub average_performance: f64,
    pub busiest: Option<String>,
}

pub fn agent_summary(snapshot: &StatusSnapshot) -> AgentSummary {
    let Some(agents) = snapshot.agent_statuses.as_ref() else {
        return AgentSummary::default();
    };
    let scores: Vec<f64> = agents
        .values()
        .filter_map(|a| a.performance_score)
        .filter(|s| s.is_finite())
        .collect();
    AgentSummary {
        total: agents.len() as u32,
        active: agents
            .values()
            .filter(|a| StatusTone::from_status(&a.status) == StatusTone::Healthy)
            .count() as u32,
        average_performance: mean(&scores),
        busiest: agents
            .iter()
            .filter(|(_, a)| !a.current_tasks.is_empty())
            .max_by_key(|(_, a)| a.current_tasks.len())
            .map(|(name, _)| name.clone()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub total: u32,
    pub in_progress: u32,
    pub average_health: f64,
    pub average_progress: f64,
}

pub fn project_summary(snapshot: &StatusSnapshot) -> ProjectSummary {
    let Some(projects) = snapshot.active_projects.as_ref() else {
        return ProjectSummary::default();
    };
    let healths: Vec<f64> = projects
        .values()
        .filter_map(|p| p.health_score)
        .filter(|s| s.is_finite())
        .collect();
    let progress: Vec<f64> = projects
        .values()
        .filter_map(|p| p.progress_percent)
        .filter(|s| s.is_finite())
        .collect();
    ProjectSummary {
        total: projects.len() as u32,
        in_progress: projects
            .values()
            .filter(|p| p.status == "in_progress")
            .count() as u32,
        average_health: mean(&healths),
        average_progress: mean(&progress),
    }
}

/// Materials whose status reads as warning or danger (e.g. "low", "empty").
pub fn low_materials(monitoring: Option<&MonitoringData>) -> Vec<String> {
    monitoring
        .and_then(|m| m.material_levels.as_ref())
        .map(|levels| {
            levels
                .iter()
                .filter(|(_, l)| {
                    l.status.as_deref().is_some_and(|s| {
                        matches!(
                            StatusTone::from_status(s),
                            StatusTone::Warning | StatusTone::Danger
                        )
                    })
                })
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Everything the presentation layer renders next to the raw snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedView {
    pub health: HealthSummary,
    pub agents: AgentSummary,
    pub projects: ProjectSummary,
    pub cameras: CameraSummary,
    pub equipment: EquipmentSummary,
    pub workforce: WorkforceSummary,
    pub safety: SafetySummary,
    pub low_materials: Vec<String>,
    pub capabilities_available: u32,
    pub capabilities_total: u32,
    pub synthetic: bool,
}

pub fn derive(snapshot: &StatusSnapshot) -> DerivedView {
    let monitoring = snapshot.monitoring_data.as_ref();
    let cameras = monitoring.and_then(|m| m.camera_analysis.as_ref());
    let capabilities = snapshot.capabilities.as_ref();
    DerivedView {
        health: health_summary(snapshot),
        agents: agent_summary(snapshot),
        projects: project_summary(snapshot),
        cameras: camera_summary(cameras),
        equipment: equipment_summary(monitoring.and_then(|m| m.equipment_status.as_ref())),
        workforce: workforce_summary(monitoring.and_then(|m| m.worker_activities.as_ref())),
        safety: safety_summary(monitoring.and_then(|m| m.safety_status.as_ref()), cameras),
        low_materials: low_materials(monitoring),
        capabilities_available: capabilities
            .map(|c| c.values().filter(|&&v| v).count() as u32)
            .unwrap_or(0),
        capabilities_total: capabilities.map(|c| c.len() as u32).unwrap_or(0),
        synthetic: snapshot.source.synthetic,
    }
}
