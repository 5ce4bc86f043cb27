use serde::Deserialize;

use crate::models::PATCH_FIELDS;
use crate::source::DEFAULT_STATUS_PATH;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub remote: RemoteConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Used to log in at startup and again after the remote rejects the token.
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig {
        name: "system-status".into(),
        path: DEFAULT_STATUS_PATH.into(),
        field: None,
    }]
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub path: String,
    /// Map the whole response body to this top-level snapshot field.
    pub field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_path")]
    pub path: String,
}

fn default_session_path() -> String {
    "data/session.json".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// How often to log refresh counters at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_stats_log_interval_secs() -> u64 {
    300
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

/// Synthetic demo data shown until the first live fetch succeeds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FallbackConfig {
    #[serde(default)]
    pub enabled: bool,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.remote.base_url.trim().is_empty(),
            "remote.base_url must be non-empty"
        );
        anyhow::ensure!(
            self.remote.request_timeout_ms > 0,
            "remote.request_timeout_ms must be > 0, got {}",
            self.remote.request_timeout_ms
        );
        anyhow::ensure!(
            self.remote.username.is_some() == self.remote.password.is_some(),
            "remote.username and remote.password must be set together"
        );
        anyhow::ensure!(
            !self.remote.sources.is_empty(),
            "remote.sources must list at least one source"
        );
        for source in &self.remote.sources {
            anyhow::ensure!(
                !source.name.is_empty(),
                "remote.sources entries need a name"
            );
            anyhow::ensure!(
                !source.path.is_empty(),
                "remote.sources.{} path must be non-empty",
                source.name
            );
            if let Some(field) = &source.field {
                anyhow::ensure!(
                    PATCH_FIELDS.contains(&field.as_str()),
                    "remote.sources.{} field must be one of {:?}, got {}",
                    source.name,
                    PATCH_FIELDS,
                    field
                );
            }
        }
        anyhow::ensure!(
            !self.session.path.is_empty(),
            "session.path must be non-empty"
        );
        anyhow::ensure!(
            self.polling.interval_ms > 0,
            "polling.interval_ms must be > 0, got {}",
            self.polling.interval_ms
        );
        anyhow::ensure!(
            self.polling.stats_log_interval_secs > 0,
            "polling.stats_log_interval_secs must be > 0, got {}",
            self.polling.stats_log_interval_secs
        );
        Ok(())
    }
}
