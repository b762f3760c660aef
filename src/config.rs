//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `FLARETRACK_*` environment overrides.

use crate::analysis::{
    AnalysisError, AnalysisOptions, AnalysisParams, TriggerKind, TriggerSet,
    DEFAULT_FLARE_THRESHOLD, DEFAULT_MIN_SAMPLE_SIZE, DEFAULT_WINDOW_DAYS,
};
use crate::journal::StoreConfig as JournalStoreConfig;
use crate::sync::{
    FileTransport, HttpTransport, HttpTransportConfig, SyncConfig as ManagerSyncConfig,
    SyncTransport,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub triggers: TriggersConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Entry store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    let Some(rest) = path.strip_prefix('~') else {
        return PathBuf::from(path);
    };
    let is_separator = |c: char| c == '/' || c == '\\';
    if !(rest.is_empty() || rest.starts_with(is_separator)) {
        // `~user` forms are left alone
        return PathBuf::from(path);
    }
    match dirs::home_dir() {
        Some(home) => {
            let rest = rest.trim_start_matches(is_separator);
            if rest.is_empty() {
                home
            } else {
                home.join(rest)
            }
        }
        None => PathBuf::from(path),
    }
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("flaretrack").to_string_lossy().to_string())
        .unwrap_or_else(|| "./flaretrack_data".to_string())
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Correlation analysis defaults
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    #[serde(default = "default_flare_threshold")]
    pub flare_threshold: u8,

    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u32,

    #[serde(default)]
    pub include_disabled: bool,
}

fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}

fn default_flare_threshold() -> u8 {
    DEFAULT_FLARE_THRESHOLD
}

fn default_min_sample_size() -> u32 {
    DEFAULT_MIN_SAMPLE_SIZE
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            flare_threshold: default_flare_threshold(),
            min_sample_size: default_min_sample_size(),
            include_disabled: false,
        }
    }
}

/// Trigger module switches
#[derive(Debug, Clone, Deserialize)]
pub struct TriggersConfig {
    #[serde(default = "default_true")]
    pub food: bool,
    #[serde(default = "default_true")]
    pub stress: bool,
    #[serde(default = "default_true")]
    pub fungal: bool,
    #[serde(default = "default_true")]
    pub sleep: bool,
    #[serde(default = "default_true")]
    pub weather: bool,
    #[serde(default = "default_true")]
    pub sweating: bool,
    #[serde(default = "default_true")]
    pub contact: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TriggersConfig {
    fn default() -> Self {
        Self {
            food: true,
            stress: true,
            fungal: true,
            sleep: true,
            weather: true,
            sweating: true,
            contact: true,
        }
    }
}

impl TriggersConfig {
    pub fn to_trigger_set(&self) -> TriggerSet {
        TriggerSet::all_enabled()
            .set(TriggerKind::Food, self.food)
            .set(TriggerKind::Stress, self.stress)
            .set(TriggerKind::Fungal, self.fungal)
            .set(TriggerKind::Sleep, self.sleep)
            .set(TriggerKind::Weather, self.weather)
            .set(TriggerKind::Sweating, self.sweating)
            .set(TriggerKind::Contact, self.contact)
    }
}

/// Which remote the journal syncs with
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    File,
    Http,
}

/// Sync configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_sync_interval")]
    pub interval_minutes: u64,

    #[serde(default)]
    pub transport: TransportKind,

    /// Shared journal file for the `file` transport
    pub remote_path: Option<String>,

    /// Document URL for the `http` transport
    pub remote_url: Option<String>,

    pub bearer_token: Option<String>,

    #[serde(default = "default_sync_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_tombstone_retention")]
    pub tombstone_retention_days: i64,
}

fn default_sync_interval() -> u64 {
    5
}

fn default_sync_timeout() -> u64 {
    30
}

fn default_tombstone_retention() -> i64 {
    90
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: default_sync_interval(),
            transport: TransportKind::default(),
            remote_path: None,
            remote_url: None,
            bearer_token: None,
            timeout_secs: default_sync_timeout(),
            tombstone_retention_days: default_tombstone_retention(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8087
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ApiConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("flaretrack").join("config.toml")),
            Some(PathBuf::from("/etc/flaretrack/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_dir) = var("FLARETRACK_DATA_DIR") {
            self.store.data_dir = data_dir;
        }

        if let Some(host) = var("FLARETRACK_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("FLARETRACK_API_PORT").and_then(|p| p.parse().ok()) {
            self.api.port = port;
        }

        if let Some(enabled) = var("FLARETRACK_SYNC_ENABLED") {
            self.sync.enabled = matches!(enabled.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(remote) = var("FLARETRACK_SYNC_REMOTE") {
            if remote.starts_with("http://") || remote.starts_with("https://") {
                self.sync.transport = TransportKind::Http;
                self.sync.remote_url = Some(remote);
            } else {
                self.sync.transport = TransportKind::File;
                self.sync.remote_path = Some(remote);
            }
        }

        if let Some(level) = var("FLARETRACK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("FLARETRACK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn store_config(&self) -> JournalStoreConfig {
        JournalStoreConfig::new(expand_home(&self.store.data_dir))
    }

    /// Default window and threshold, validated
    pub fn analysis_params(&self) -> Result<AnalysisParams, AnalysisError> {
        AnalysisParams::new(self.analysis.window_days, self.analysis.flare_threshold)
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            min_sample_size: self.analysis.min_sample_size,
            include_disabled: self.analysis.include_disabled,
        }
    }

    pub fn sync_config(&self) -> ManagerSyncConfig {
        ManagerSyncConfig {
            enabled: self.sync.enabled,
            interval: Duration::from_secs(self.sync.interval_minutes.max(1) * 60),
            transport_timeout: Duration::from_secs(self.sync.timeout_secs.max(1)),
            tombstone_retention: chrono::Duration::days(self.sync.tombstone_retention_days.max(0)),
        }
    }

    /// Build the configured sync transport
    pub fn build_transport(&self) -> Result<Arc<dyn SyncTransport>, ConfigError> {
        match self.sync.transport {
            TransportKind::File => {
                let path = self.sync.remote_path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sync.remote_path is required for the file transport".into())
                })?;
                Ok(Arc::new(FileTransport::new(expand_home(path))))
            }
            TransportKind::Http => {
                let url = self.sync.remote_url.clone().ok_or_else(|| {
                    ConfigError::Invalid("sync.remote_url is required for the http transport".into())
                })?;
                let transport = HttpTransport::new(HttpTransportConfig {
                    url,
                    bearer_token: self.sync.bearer_token.clone(),
                    timeout: Duration::from_secs(self.sync.timeout_secs.max(1)),
                })
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                Ok(Arc::new(transport))
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Flaretrack Configuration
#
# Environment variables override these settings:
# - FLARETRACK_DATA_DIR
# - FLARETRACK_API_HOST
# - FLARETRACK_API_PORT
# - FLARETRACK_SYNC_ENABLED
# - FLARETRACK_SYNC_REMOTE (path or http(s) URL)
# - FLARETRACK_LOG_LEVEL
# - FLARETRACK_LOG_FORMAT

[store]
# Directory holding entries.json and sync_state.json
# A leading ~ is expanded to the home directory
data_dir = "~/.local/share/flaretrack"

[analysis]
# Days after a trigger in which a flare counts (1-5)
window_days = 2

# Severity at or above which a day is a flare day (1-5)
flare_threshold = 4

# Occurrences needed before a probability is reported
min_sample_size = 3

# Also score triggers whose module is switched off below
include_disabled = false

[triggers]
food = true
stress = true
fungal = true
sleep = true
weather = true
sweating = true
contact = true

[sync]
# Enable multi-device sync
enabled = false

# Periodic sync interval (minutes); saves also trigger a sync
interval_minutes = 5

# Transport: "file" (shared cloud-drive folder) or "http"
transport = "file"

# Shared journal document for the file transport
# remote_path = "~/Dropbox/flaretrack/journal.json"

# Document URL and optional bearer token for the http transport
# remote_url = "https://example.com/flaretrack/journal.json"
# bearer_token = ""

# Timeout for each fetch or push (seconds)
timeout_secs = 30

# Deleted days are forgotten once every device has seen the deletion
# and it is older than this (days)
tombstone_retention_days = 90

[api]
# API server host
host = "127.0.0.1"

# API server port
port = 8087

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/flaretrack/flaretrack.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analysis.window_days, 2);
        assert_eq!(config.analysis.flare_threshold, 4);
        assert_eq!(config.analysis.min_sample_size, 3);
        assert_eq!(config.sync.interval_minutes, 5);
        assert_eq!(config.api.port, 8087);
        assert!(!config.sync.enabled);
        assert!(config.analysis_params().is_ok());
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.store.data_dir, "~/.local/share/flaretrack");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                config.store_config().data_dir,
                home.join(".local/share/flaretrack")
            );
        }
        assert_eq!(config.sync.tombstone_retention_days, 90);
        assert_eq!(config.sync.transport, TransportKind::File);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [analysis]
            window_days = 3

            [triggers]
            weather = false
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis.window_days, 3);
        assert_eq!(config.analysis.flare_threshold, 4);

        let set = config.triggers.to_trigger_set();
        assert!(!set.is_enabled(TriggerKind::Weather));
        assert!(set.is_enabled(TriggerKind::Food));
    }

    #[test]
    fn test_invalid_analysis_defaults() {
        let config: Config = toml::from_str("[analysis]\nwindow_days = 9\n").unwrap();
        assert!(config.analysis_params().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FLARETRACK_DATA_DIR", "/tmp/journal"),
            ("FLARETRACK_API_PORT", "9000"),
            ("FLARETRACK_SYNC_ENABLED", "true"),
            ("FLARETRACK_SYNC_REMOTE", "https://sync.example.com/journal.json"),
            ("FLARETRACK_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.store.data_dir, "/tmp/journal");
        assert_eq!(config.api.port, 9000);
        assert!(config.sync.enabled);
        assert_eq!(config.sync.transport, TransportKind::Http);
        assert_eq!(
            config.sync.remote_url.as_deref(),
            Some("https://sync.example.com/journal.json")
        );
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_build_transport() {
        let mut config = Config::default();
        assert!(matches!(config.build_transport(), Err(ConfigError::Invalid(_))));

        config.sync.remote_path = Some("/tmp/shared/journal.json".into());
        assert_eq!(config.build_transport().unwrap().name(), "file");

        config.sync.transport = TransportKind::Http;
        config.sync.remote_url = Some("http://localhost:9999/journal.json".into());
        assert_eq!(config.build_transport().unwrap().name(), "http");
    }

    #[test]
    fn test_sync_config_conversion() {
        let mut config = Config::default();
        config.sync.enabled = true;
        config.sync.interval_minutes = 10;
        let sync = config.sync_config();
        assert!(sync.enabled);
        assert_eq!(sync.interval, Duration::from_secs(600));
        assert_eq!(sync.tombstone_retention, chrono::Duration::days(90));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/var/lib/flaretrack"), PathBuf::from("/var/lib/flaretrack"));
        assert_eq!(expand_home("journal"), PathBuf::from("journal"));
        assert_eq!(expand_home("~alice/journal"), PathBuf::from("~alice/journal"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/journal"), home.join("journal"));

            let mut config = Config::default();
            config.store.data_dir = "~/flaretrack".into();
            assert_eq!(config.store_config().data_dir, home.join("flaretrack"));
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/flaretrack.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
