//! Configuration module for LexSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::policy::CachePolicy;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for LexSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Whether queued changes are pushed automatically while online.
    pub auto_sync: bool,
    /// Quiet period (ms) after the last queue change before auto-sync fires.
    pub auto_sync_delay_ms: u64,
    /// How long (ms) a success/error status is shown before resetting to idle.
    pub status_reset_ms: u64,
    /// Failed attempts before a change is dead-lettered. `0` disables the cap.
    pub max_retries: u32,
    /// Upper bound (s) on a single remote call.
    pub remote_timeout_secs: u64,
    /// Seconds between connectivity probes and offline-state refreshes in
    /// the daemon.
    pub probe_interval_secs: u64,
}

/// Remote case-management API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL, e.g. `https://cases.example.org/api`.
    pub base_url: String,
    /// Optional bearer token sent with every request.
    pub api_token: Option<String>,
}

/// Offline cache settings.
///
/// The size and retention values are the defaults used until the user saves
/// their own cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path to the SQLite database file.
    pub database: PathBuf,
    pub max_size_mb: u64,
    pub retention_days: u32,
    pub auto_cleanup: bool,
}

impl CacheConfig {
    /// Cache policy built from the configured defaults.
    pub fn default_policy(&self) -> CachePolicy {
        CachePolicy::new(self.max_size_mb, self.retention_days, self.auto_cleanup)
    }
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/lexsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("lexsync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            auto_sync_delay_ms: 5000,
            status_reset_ms: 3000,
            max_retries: 5,
            remote_timeout_secs: 30,
            probe_interval_secs: 15,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            api_token: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("lexsync");
        Self {
            database: data_dir.join("lexsync.db"),
            max_size_mb: 100,
            retention_days: 30,
            auto_cleanup: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.auto_sync_delay_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.auto_sync_delay_ms == 0 {
            errors.push(ValidationError {
                field: "sync.auto_sync_delay_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.remote_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "sync.remote_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.probe_interval_secs == 0 {
            errors.push(ValidationError {
                field: "sync.probe_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- remote ---
        let url = self.remote.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "remote.base_url".into(),
                message: format!("must be an http(s) URL, got '{}'", url),
            });
        }
        if matches!(&self.remote.api_token, Some(token) if token.trim().is_empty()) {
            errors.push(ValidationError {
                field: "remote.api_token".into(),
                message: "must not be empty when set".into(),
            });
        }

        // --- cache ---
        if self.cache.max_size_mb == 0 {
            errors.push(ValidationError {
                field: "cache.max_size_mb".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.cache.retention_days == 0 {
            errors.push(ValidationError {
                field: "cache.retention_days".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use lexsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .remote_base_url("https://cases.example.org/api")
///     .sync_max_retries(3)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_auto_sync(mut self, enabled: bool) -> Self {
        self.config.sync.auto_sync = enabled;
        self
    }

    pub fn sync_auto_sync_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.auto_sync_delay_ms = ms;
        self
    }

    pub fn sync_status_reset_ms(mut self, ms: u64) -> Self {
        self.config.sync.status_reset_ms = ms;
        self
    }

    pub fn sync_max_retries(mut self, n: u32) -> Self {
        self.config.sync.max_retries = n;
        self
    }

    pub fn sync_remote_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.sync.remote_timeout_secs = seconds;
        self
    }

    pub fn sync_probe_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.probe_interval_secs = seconds;
        self
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_api_token(mut self, token: impl Into<String>) -> Self {
        self.config.remote.api_token = Some(token.into());
        self
    }

    // --- cache ---

    pub fn cache_database(mut self, path: PathBuf) -> Self {
        self.config.cache.database = path;
        self
    }

    pub fn cache_max_size_mb(mut self, mb: u64) -> Self {
        self.config.cache.max_size_mb = mb;
        self
    }

    pub fn cache_retention_days(mut self, days: u32) -> Self {
        self.config.cache.retention_days = days;
        self
    }

    pub fn cache_auto_cleanup(mut self, enabled: bool) -> Self {
        self.config.cache.auto_cleanup = enabled;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
