//! Shared command context
//!
//! Every command runs against the same wiring: configuration loaded from the
//! `--config` path (or the default location), the SQLite-backed offline
//! cache, the HTTP remote, and a [`SyncEngine`] restored from the last
//! snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use lexsync_cache::{CacheSettingsManager, DatabasePool, OfflineCache, SqliteKeyValueStore};
use lexsync_core::config::Config;
use lexsync_core::domain::ConnectivityState;
use lexsync_core::ports::{INotificationService, Notification, NotificationPriority};
use lexsync_remote::{HttpRemoteEndpoint, RemoteClient};
use lexsync_sync::{ConnectivityMonitor, ConnectivityProbe, EngineOptions, SyncEngine};

use crate::output::{get_formatter, OutputFormat};

/// Global options resolved once in `main`
pub struct AppContext {
    pub format: OutputFormat,
    pub config_path: PathBuf,
    pub config: Config,
}

impl AppContext {
    /// Loads the configuration
    ///
    /// An explicit `--config` path must exist and parse; the default path
    /// falls back to built-in defaults.
    pub fn load(format: OutputFormat, config: Option<&Path>) -> Result<Self> {
        let (config_path, config) = match config {
            Some(path) => {
                let config = Config::load(path).with_context(|| {
                    format!("Failed to load configuration from {}", path.display())
                })?;
                (path.to_path_buf(), config)
            }
            None => {
                let path = Config::default_path();
                let config = Config::load_or_default(&path);
                (path, config)
            }
        };
        debug!(config_path = %config_path.display(), "Loaded configuration");

        Ok(Self {
            format,
            config_path,
            config,
        })
    }

    /// Opens the database and restores the engine
    ///
    /// With `probe` set, the remote's health endpoint is checked once so the
    /// engine sees the real network state.
    pub async fn open_engine(&self, probe: bool) -> Result<SyncEngine> {
        let db_path = &self.config.cache.database;
        let pool = DatabasePool::new(db_path)
            .await
            .context("Failed to open database")?;
        let store = Arc::new(SqliteKeyValueStore::new(pool.pool().clone()));
        let cache = OfflineCache::new(store.clone());
        let settings =
            CacheSettingsManager::new(store, cache.clone(), self.config.cache.default_policy());

        let timeout = Duration::from_secs(self.config.sync.remote_timeout_secs);
        let client = RemoteClient::from_config(&self.config.remote, timeout)
            .context("Failed to create remote client")?;
        let remote = Arc::new(HttpRemoteEndpoint::new(client));

        let connectivity = Arc::new(ConnectivityMonitor::new(ConnectivityState::Online));
        if probe {
            let probe = ConnectivityProbe::new(
                remote.clone(),
                connectivity.clone(),
                Duration::from_secs(self.config.sync.probe_interval_secs),
            );
            let state = probe.check_once().await;
            info!(%state, base_url = %self.config.remote.base_url, "Probed remote");
        }

        let notifier = Arc::new(ConsoleNotifier::new(self.format));
        let engine = SyncEngine::open(
            cache,
            settings,
            remote,
            notifier,
            connectivity,
            EngineOptions::from_config(&self.config.sync),
        )
        .await;
        Ok(engine)
    }
}

/// Prints engine notifications through the output formatter
pub struct ConsoleNotifier {
    format: OutputFormat,
}

impl ConsoleNotifier {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

#[async_trait::async_trait]
impl INotificationService for ConsoleNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        let formatter = get_formatter(self.format);
        let line = format!("{}: {}", notification.title, notification.body);
        match notification.priority {
            NotificationPriority::High => formatter.warn(&line),
            NotificationPriority::Normal => formatter.success(&line),
            NotificationPriority::Low => formatter.info(&line),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_config_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "remote:\n  base_url: https://cases.example.org/api\nsync:\n  max_retries: 2"
        )
        .unwrap();

        let ctx = AppContext::load(OutputFormat::Human, Some(file.path())).unwrap();

        assert_eq!(ctx.config_path, file.path());
        assert_eq!(ctx.config.remote.base_url, "https://cases.example.org/api");
        assert_eq!(ctx.config.sync.max_retries, 2);
        assert!(ctx.config.sync.auto_sync);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");

        assert!(AppContext::load(OutputFormat::Json, Some(&missing)).is_err());
    }

    #[tokio::test]
    async fn test_open_engine_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "cache:\n  database: {}",
            dir.path().join("data").join("lexsync.db").display()
        )
        .unwrap();
        let ctx = AppContext::load(OutputFormat::Json, Some(file.path())).unwrap();

        let engine = ctx.open_engine(false).await.unwrap();

        assert_eq!(engine.pending_count(), 0);
        assert!(dir.path().join("data").join("lexsync.db").exists());
    }
}
