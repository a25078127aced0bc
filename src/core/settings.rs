use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One leap year.
pub const MAX_REPORT_WINDOW_HOURS: u32 = 8784;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stack_name: String,
    /// `<vendor>/<solution>/<variant>`; the middle segment identifies usage reports.
    pub solution_id: String,
    pub version: String,
    pub debug: bool,
    pub store: StoreSettings,
    pub backend: BackendSettings,
    pub schedule: ScheduleSettings,
    pub metrics: MetricsSettings,
    pub commands: CommandSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stack_name: "media-inventory".to_string(),
            solution_id: "media-inventory/MI0001/default".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            debug: false,
            store: StoreSettings::default(),
            backend: BackendSettings::default(),
            schedule: ScheduleSettings::default(),
            metrics: MetricsSettings::default(),
            commands: CommandSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub user_agent_extra: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 30,
            user_agent_extra: None,
        }
    }
}

/// Job intervals, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub nodes: u64,
    pub ssm_nodes: u64,
    pub alarms: u64,
    pub connections: u64,
    pub ssm_commands: u64,
    pub generate_metrics: u64,
    pub report_metrics: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            nodes: 60,
            ssm_nodes: 60,
            alarms: 60,
            connections: 300,
            ssm_commands: 300,
            generate_metrics: 3600,
            report_metrics: 86400,
        }
    }
}

impl ScheduleSettings {
    fn entries(&self) -> [(&'static str, u64); 7] {
        [
            ("nodes", self.nodes),
            ("ssm_nodes", self.ssm_nodes),
            ("alarms", self.alarms),
            ("connections", self.connections),
            ("ssm_commands", self.ssm_commands),
            ("generate_metrics", self.generate_metrics),
            ("report_metrics", self.report_metrics),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub namespace: String,
    pub metric_name: String,
    pub report_enabled: bool,
    pub report_endpoint: String,
    pub report_window_hours: u32,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            namespace: "MediaInventory".to_string(),
            metric_name: "Resource Count".to_string(),
            report_enabled: false,
            report_endpoint: String::new(),
            report_window_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub log_group: String,
    pub node_type_tag: String,
    pub node_types: Vec<String>,
    pub timeout_secs: u64,
    pub max_concurrency: String,
    pub max_errors: String,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            log_group: "MediaInventory/RunCommand".to_string(),
            node_type_tag: "MediaInventory-NodeType".to_string(),
            node_types: vec!["ElementalLive".to_string()],
            timeout_secs: 600,
            max_concurrency: "50".to_string(),
            max_errors: "0".to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("media-inventory").join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, secs) in self.schedule.entries() {
            if secs == 0 {
                anyhow::bail!("schedule.{} must be greater than zero", name);
            }
        }

        if self.backend.endpoint.trim().is_empty() {
            anyhow::bail!("backend.endpoint must not be empty");
        }

        if self.solution_segment().is_none() {
            anyhow::bail!(
                "solution_id must have the form <vendor>/<solution>/<variant>, got {:?}",
                self.solution_id
            );
        }

        if self.metrics.report_window_hours == 0
            || self.metrics.report_window_hours > MAX_REPORT_WINDOW_HOURS
        {
            anyhow::bail!(
                "metrics.report_window_hours must be between 1 and {}, got {}",
                MAX_REPORT_WINDOW_HOURS,
                self.metrics.report_window_hours
            );
        }

        if self.metrics.report_enabled && self.metrics.report_endpoint.trim().is_empty() {
            anyhow::bail!("metrics.report_endpoint is required when reporting is enabled");
        }

        Ok(())
    }

    pub fn solution_segment(&self) -> Option<&str> {
        let parts: Vec<&str> = self.solution_id.split('/').collect();
        match parts.as_slice() {
            [_, solution, _] if !solution.is_empty() => Some(*solution),
            _ => None,
        }
    }

    pub fn store_path(&self) -> Option<PathBuf> {
        self.store
            .path
            .clone()
            .or_else(crate::core::store::FileSettingsStore::default_path)
    }
}
