// Domain models: status snapshot, agents, projects, site telemetry, operations

mod agent;
mod health;
mod monitoring;
mod operations;
mod snapshot;

pub use agent::{AgentStatus, ProjectStatus};
pub use health::SystemHealth;
pub use monitoring::{
    CameraAnalysis, CameraFeed, EquipmentDetected, EquipmentItem, EquipmentStatus, FeedAnalysis,
    MaterialLevel, MonitoringData, SafetyStatus, SensorData, WeatherData, WorkerActivities,
    WorkersDetected,
};
pub use operations::{EmergencyRequest, OperationReport};
pub use snapshot::{PATCH_FIELDS, SourceInfo, StatusPatch, StatusSnapshot};
