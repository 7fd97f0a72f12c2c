//! LexSync Daemon - Background connectivity and auto-sync service
//!
//! This binary runs as a user service and handles:
//! - Periodic health probes against the case-management API
//! - Automatic sync of queued changes once the app is online
//! - Connectivity and sync notifications (written to the log)
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon restores the [`SyncEngine`] from the offline cache, then runs
//! the [`ConnectivityProbe`] and the [`AutoSyncScheduler`] as tasks. Both are
//! controlled by a `CancellationToken` that is triggered on receipt of
//! SIGTERM or SIGINT; the same token interrupts an in-flight sync pass.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use lexsync_cache::{CacheSettingsManager, DatabasePool, OfflineCache, SqliteKeyValueStore};
use lexsync_core::{
    config::{Config, LoggingConfig},
    domain::ConnectivityState,
};
use lexsync_remote::{HttpRemoteEndpoint, RemoteClient};
use lexsync_sync::{
    AutoSyncScheduler, ConnectivityMonitor, ConnectivityProbe, EngineOptions, SyncEngine,
    TracingNotifier,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the engine and the background tasks driving it
struct DaemonService {
    /// Application configuration loaded from YAML
    config: Config,
    /// Kept open for the lifetime of the daemon
    _db_pool: DatabasePool,
    remote: Arc<HttpRemoteEndpoint>,
    engine: Arc<SyncEngine>,
    /// Token for signalling graceful shutdown to all async tasks
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Opens the database and restores the engine from the last snapshot
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let db_pool = DatabasePool::new(&config.cache.database)
            .await
            .context("Failed to open database")?;
        info!(database = %config.cache.database.display(), "Database opened");

        let store = Arc::new(SqliteKeyValueStore::new(db_pool.pool().clone()));
        let cache = OfflineCache::new(store.clone());
        let settings = CacheSettingsManager::new(store, cache.clone(), config.cache.default_policy());

        let client = RemoteClient::from_config(
            &config.remote,
            Duration::from_secs(config.sync.remote_timeout_secs),
        )
        .context("Failed to create remote client")?;
        let remote = Arc::new(HttpRemoteEndpoint::new(client));

        // Assume reachable until the first probe says otherwise
        let connectivity = Arc::new(ConnectivityMonitor::new(ConnectivityState::Online));

        let engine = SyncEngine::open(
            cache,
            settings,
            remote.clone(),
            Arc::new(TracingNotifier::new()),
            connectivity,
            EngineOptions::from_config(&config.sync),
        )
        .await
        .with_shutdown(shutdown.clone());

        let state = engine.state().await;
        info!(
            records = state.records().len(),
            pending = state.pending().len(),
            dead_letters = state.dead_letters().len(),
            offline_mode = state.offline_mode(),
            "Offline state restored"
        );

        Ok(Self {
            config,
            _db_pool: db_pool,
            remote,
            engine: Arc::new(engine),
            shutdown,
        })
    }

    // ========================================================================
    // DaemonService::run()
    // ========================================================================

    /// Runs until the shutdown token is cancelled
    ///
    /// 1. Probes the remote once so the scheduler starts from the real state
    /// 2. Spawns the periodic probe and the auto-sync scheduler
    /// 3. Waits for shutdown and joins both tasks
    async fn run(&self) -> Result<()> {
        let probe = ConnectivityProbe::new(
            self.remote.clone(),
            Arc::clone(self.engine.connectivity()),
            Duration::from_secs(self.config.sync.probe_interval_secs),
        );
        let initial = probe.check_once().await;
        info!(state = %initial, base_url = %self.config.remote.base_url, "Initial connectivity");

        let probe_token = self.shutdown.child_token();
        let probe_task = tokio::spawn(async move { probe.run(probe_token).await });

        let scheduler = AutoSyncScheduler::from_config(Arc::clone(&self.engine), &self.config.sync);
        let scheduler_task = tokio::spawn(scheduler.run(self.shutdown.child_token()));

        self.shutdown.cancelled().await;
        info!("Shutdown signal received");

        if let Err(e) = probe_task.await {
            warn!(error = %e, "Connectivity probe task ended abnormally");
        }
        if let Err(e) = scheduler_task.await {
            warn!(error = %e, "Auto-sync scheduler task ended abnormally");
        }

        info!(
            pending = self.engine.pending_count(),
            "Background tasks stopped"
        );
        Ok(())
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
///
/// If a handler cannot be installed the error is logged and only the other
/// signal is awaited.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Logging
// ============================================================================

/// Filter from `RUST_LOG`, falling back to the configured level
fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(logging))
        .with_target(true);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);

    init_tracing(&config.logging);

    info!(config_path = %config_path.display(), "LexSync daemon starting (lexsyncd)");

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!(field = %e.field, "{}", e.message);
        }
        anyhow::bail!("Invalid configuration ({} error(s))", errors.len());
    }

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token.clone()).await?;

    let result = service.run().await;

    match &result {
        Ok(()) => info!("LexSync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "LexSync daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
