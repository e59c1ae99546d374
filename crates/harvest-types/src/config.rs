//! Configuration loading for the incremental harvester.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/index-harvester/config.toml.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::target::Target;

/// Where checkpoints are persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointBackend {
    /// One JSON status file per target (default)
    #[default]
    File,
    /// One RocksDB database with a checkpoints column family
    Rocksdb,
}

/// Harvesting endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvesterSettings {
    /// Endpoint template, `{target}` is replaced by the target name
    #[serde(default)]
    pub url_template: Option<String>,

    /// Basic auth user for the harvesting endpoint
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password (prefer HARVEST_HARVESTER__PASSWORD over the file)
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,

    #[serde(default = "default_harvester_timeout")]
    pub timeout_secs: u64,
}

fn default_harvester_timeout() -> u64 {
    60
}

impl Default for HarvesterSettings {
    fn default() -> Self {
        Self {
            url_template: None,
            username: None,
            password: None,
            timeout_secs: default_harvester_timeout(),
        }
    }
}

/// Remote indexer control endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessengerSettings {
    /// Control port on every index host
    #[serde(default = "default_messenger_port")]
    pub port: u16,

    /// Index host for targets that do not name one
    #[serde(default)]
    pub index_host: Option<String>,

    #[serde(default = "default_messenger_timeout")]
    pub timeout_secs: u64,
}

fn default_messenger_port() -> u16 {
    8321
}

fn default_messenger_timeout() -> u64 {
    30
}

impl Default for MessengerSettings {
    fn default() -> Self {
        Self {
            port: default_messenger_port(),
            index_host: None,
            timeout_secs: default_messenger_timeout(),
        }
    }
}

/// Per-target overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetSettings {
    #[serde(default)]
    pub harvest_url: Option<String>,

    #[serde(default)]
    pub index_host: Option<String>,

    /// Hosted on this machine; picked up by `-l`
    #[serde(default)]
    pub local: bool,
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (or RocksDB path) holding checkpoints
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: String,

    #[serde(default)]
    pub checkpoint_backend: CheckpointBackend,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Records requested per harvester round-trip
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Dispatch is held back while the remote queue is at least this deep
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,

    #[serde(default = "default_backpressure_interval")]
    pub backpressure_interval_ms: u64,

    /// Flush and snapshot status poll interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Wait for a flush acknowledgment before advancing checkpoints
    #[serde(default = "default_true")]
    pub wait_for_flush: bool,

    /// Sleep between daemon cycles
    #[serde(default = "default_sleep_secs")]
    pub sleep_secs: u64,

    /// Start timestamp for targets without a checkpoint
    #[serde(default = "default_timestamp")]
    pub default_timestamp: String,

    /// Snapshot path pattern template, `{target}` is replaced
    #[serde(default = "default_snapshot_pattern")]
    pub snapshot_pattern: String,

    #[serde(default)]
    pub harvester: HarvesterSettings,

    #[serde(default)]
    pub messenger: MessengerSettings,

    #[serde(default)]
    pub targets: BTreeMap<String, TargetSettings>,
}

fn default_checkpoint_dir() -> String {
    ProjectDirs::from("", "", "index-harvester")
        .map(|p| p.data_local_dir().join("checkpoints"))
        .unwrap_or_else(|| PathBuf::from("./checkpoints"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_max_queue_depth() -> usize {
    500
}

fn default_backpressure_interval() -> u64 {
    5000
}

fn default_poll_interval() -> u64 {
    1500
}

fn default_true() -> bool {
    true
}

fn default_sleep_secs() -> u64 {
    30
}

fn default_timestamp() -> String {
    "2001-01-01".to_string()
}

fn default_snapshot_pattern() -> String {
    "{target}|{target}.pa*|{target}.ns*|{target}.h*".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            checkpoint_dir: default_checkpoint_dir(),
            checkpoint_backend: CheckpointBackend::default(),
            log_level: default_log_level(),
            batch_size: default_batch_size(),
            max_queue_depth: default_max_queue_depth(),
            backpressure_interval_ms: default_backpressure_interval(),
            poll_interval_ms: default_poll_interval(),
            wait_for_flush: true,
            sleep_secs: default_sleep_secs(),
            default_timestamp: default_timestamp(),
            snapshot_pattern: default_snapshot_pattern(),
            harvester: HarvesterSettings::default(),
            messenger: MessengerSettings::default(),
            targets: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/index-harvester/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (HARVEST_*, `__` separates nested keys)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from("", "", "index-harvester")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("checkpoint_dir", default_checkpoint_dir())
            .map_err(|e| ConfigError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| ConfigError::Config(e.to_string()))?
            .set_default("batch_size", default_batch_size() as i64)
            .map_err(|e| ConfigError::Config(e.to_string()))?
            .set_default("max_queue_depth", default_max_queue_depth() as i64)
            .map_err(|e| ConfigError::Config(e.to_string()))?
            .set_default("default_timestamp", default_timestamp())
            .map_err(|e| ConfigError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // HARVEST_BATCH_SIZE, HARVEST_HARVESTER__PASSWORD, ...
        builder = builder.add_source(
            Environment::with_prefix("HARVEST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ConfigError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| ConfigError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidInput(
                "batch_size must be > 0".to_string(),
            ));
        }
        if self.max_queue_depth == 0 {
            return Err(ConfigError::InvalidInput(
                "max_queue_depth must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the target for `name` from per-target entries and templates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownTarget` when neither a harvesting
    /// endpoint nor an index host can be determined.
    pub fn resolve_target(&self, name: &str) -> Result<Target, ConfigError> {
        let entry = self.targets.get(name);

        let harvest_url = entry
            .and_then(|t| t.harvest_url.clone())
            .or_else(|| {
                self.harvester
                    .url_template
                    .as_ref()
                    .map(|tpl| tpl.replace("{target}", name))
            })
            .ok_or_else(|| {
                ConfigError::UnknownTarget(format!("{}: no harvesting endpoint configured", name))
            })?;

        let index_host = entry
            .and_then(|t| t.index_host.clone())
            .or_else(|| self.messenger.index_host.clone())
            .ok_or_else(|| {
                ConfigError::UnknownTarget(format!("{}: no index host configured", name))
            })?;

        Ok(Target::new(name, harvest_url, index_host))
    }

    /// Names of all targets hosted on this machine.
    pub fn local_targets(&self) -> Vec<String> {
        self.targets
            .iter()
            .filter(|(_, t)| t.local)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn backpressure_interval(&self) -> Duration {
        Duration::from_millis(self.backpressure_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs(self.sleep_secs)
    }

    /// Expand ~ in checkpoint_dir to the actual home directory
    pub fn expanded_checkpoint_dir(&self) -> PathBuf {
        if let Some(rest) = self.checkpoint_dir.strip_prefix("~/") {
            if let Some(home) = dirs_home() {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.checkpoint_dir)
    }
}

/// Get user's home directory
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .or_else(|| std::env::var("HOME").ok().map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.max_queue_depth, 500);
        assert_eq!(settings.sleep_secs, 30);
        assert_eq!(settings.default_timestamp, "2001-01-01");
        assert_eq!(settings.backpressure_interval(), Duration::from_secs(5));
        assert_eq!(settings.poll_interval(), Duration::from_millis(1500));
        assert!(settings.wait_for_flush);
        assert_eq!(settings.checkpoint_backend, CheckpointBackend::File);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("harvest.toml");
        std::fs::write(
            &path,
            r#"
batch_size = 20
max_queue_depth = 100
checkpoint_backend = "rocksdb"

[harvester]
url_template = "http://gateway/{target}"

[messenger]
index_host = "indexer1"

[targets.enwiki]
index_host = "indexer2"
local = true
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path.to_string_lossy())).unwrap();
        assert_eq!(settings.batch_size, 20);
        assert_eq!(settings.max_queue_depth, 100);
        assert_eq!(settings.checkpoint_backend, CheckpointBackend::Rocksdb);
        assert_eq!(settings.local_targets(), vec!["enwiki".to_string()]);
    }

    #[test]
    fn test_harvester_password_is_redacted() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("harvest.toml");
        std::fs::write(
            &path,
            r#"
[harvester]
username = "harvester"
password = "hunter2"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path.to_string_lossy())).unwrap();
        let password = settings.harvester.password.as_ref().unwrap();
        assert_eq!(password.expose_secret(), "hunter2");
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = Settings::load(Some("/nonexistent/harvest-config.toml"));
        assert!(matches!(result, Err(ConfigError::Config(_))));
    }

    #[test]
    fn test_resolve_target_prefers_entry_over_template() {
        let mut settings = Settings::default();
        settings.harvester.url_template = Some("http://gateway/{target}".to_string());
        settings.messenger.index_host = Some("indexer1".to_string());
        settings.targets.insert(
            "enwiki".to_string(),
            TargetSettings {
                harvest_url: None,
                index_host: Some("indexer2".to_string()),
                local: false,
            },
        );

        let enwiki = settings.resolve_target("enwiki").unwrap();
        assert_eq!(enwiki.harvest_url, "http://gateway/enwiki");
        assert_eq!(enwiki.index_host, "indexer2");

        let dewiki = settings.resolve_target("dewiki").unwrap();
        assert_eq!(dewiki.index_host, "indexer1");
    }

    #[test]
    fn test_resolve_target_unknown() {
        let settings = Settings::default();
        let result = settings.resolve_target("enwiki");
        assert!(matches!(result, Err(ConfigError::UnknownTarget(_))));
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let settings = Settings {
            batch_size: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
