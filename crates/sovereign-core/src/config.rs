//! Engine configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::state::{Catalog, ResourceBundle};

/// Longest accepted tick interval (one day).
const MAX_TICK_INTERVAL_SECS: u64 = 86_400;

/// Main engine configuration, loaded from .sovereign/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Config version
    pub version: Option<String>,

    /// Seconds between scheduler ticks; also the production cadence
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Maximum deferred events drained per tick
    #[serde(default = "default_event_batch_limit")]
    pub event_batch_limit: usize,

    /// Name of the sorted set holding deferred events
    #[serde(default = "default_events_key")]
    pub events_key: String,

    /// Engine journal (relative to project root)
    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,

    /// Resources credited to a newly founded island
    #[serde(default = "default_starting_resources")]
    pub starting_resources: ResourceBundle,

    /// Islands are placed in a square of this side length
    #[serde(default = "default_map_size")]
    pub map_size: i32,

    /// Building types and production rates
    #[serde(default)]
    pub catalog: Catalog,
}

fn default_tick_interval() -> u64 {
    5
}
fn default_event_batch_limit() -> usize {
    250
}
fn default_events_key() -> String {
    "game_events".to_string()
}
fn default_journal_path() -> PathBuf {
    PathBuf::from(".sovereign/events.jsonl")
}
fn default_starting_resources() -> ResourceBundle {
    ResourceBundle {
        wood: 100,
        iron: 20,
        gold: 50,
        grain: 25,
        ..Default::default()
    }
}
fn default_map_size() -> i32 {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: None,
            tick_interval_secs: default_tick_interval(),
            event_batch_limit: default_event_batch_limit(),
            events_key: default_events_key(),
            journal_path: default_journal_path(),
            starting_resources: default_starting_resources(),
            map_size: default_map_size(),
            catalog: Catalog::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Load from project root (looks for .sovereign/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self> {
        let config_path = Self::project_config_path(project_root);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn project_config_path(project_root: &Path) -> PathBuf {
        project_root.join(".sovereign/config.yaml")
    }

    /// Resolve paths relative to project root
    pub fn resolve_paths(&mut self, project_root: &Path) {
        self.journal_path = project_root.join(&self.journal_path);
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Tick interval as a chrono duration, for timestamp arithmetic.
    pub fn production_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.tick_interval_secs.min(MAX_TICK_INTERVAL_SECS) as i64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_secs == 0 {
            anyhow::bail!("tick_interval_secs must be positive");
        }
        if self.tick_interval_secs > MAX_TICK_INTERVAL_SECS {
            anyhow::bail!("tick_interval_secs must be at most {}", MAX_TICK_INTERVAL_SECS);
        }
        if self.event_batch_limit == 0 {
            anyhow::bail!("event_batch_limit must be positive");
        }
        if self.events_key.trim().is_empty() {
            anyhow::bail!("events_key must not be empty");
        }
        if self.map_size <= 0 {
            anyhow::bail!("map_size must be positive");
        }
        let problems = self.catalog.problems();
        if !problems.is_empty() {
            anyhow::bail!("catalog problems: {}", problems.join("; "));
        }
        Ok(())
    }
}

/// Default config file written by `sovereign init`.
pub const DEFAULT_CONFIG_YAML: &str = r#"# Sovereign engine configuration

# Seconds between scheduler ticks. Buildings produce once per interval.
tick_interval_secs: 5

# Deferred events drained per tick
event_batch_limit: 250
events_key: game_events

journal_path: .sovereign/events.jsonl

starting_resources:
  wood: 100
  iron: 20
  gold: 50
  grain: 25

map_size: 1000

# Omit `catalog` to use the built-in building catalog.
"#;
