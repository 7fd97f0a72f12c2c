//! Offline sync engine
//!
//! The [`SyncEngine`] keeps an in-memory copy of the [`OfflineState`] and
//! drains the pending queue against the remote endpoint. The store is the
//! source of truth: the CLI and the daemon may share it, so every mutation
//! reloads the stored state, applies the change, and writes it back only if
//! no other process wrote in between.
//!
//! ## Sync Flow
//!
//! 1. **Guard**: refuse while offline, or while a pass runs in this or
//!    another process (the [`SyncLease`])
//! 2. **Drain**: reload the queue, push each change individually with a
//!    timeout
//! 3. **Bookkeeping**: confirm or fail each change against the latest stored
//!    state, stamp `last_sync`, run auto-cleanup, persist, notify
//!
//! ## Status
//!
//! The engine status moves `Idle → Syncing → {Success, Error}` and falls back
//! to `Idle` after the configured display timeout. Each status change carries
//! a generation number so a stale reset never hides a newer status.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use lexsync_cache::{
    eviction, CacheError, CacheSettingsManager, CleanupReport, OfflineCache, SyncLease,
};
use lexsync_core::config::SyncConfig;
use lexsync_core::domain::{
    CachedRecord, ChangeId, ChangeKind, FailureOutcome, OfflineState, PendingChange, RecordId,
    SyncStatus, SyncTrigger,
};
use lexsync_core::ports::{INotificationService, IRemoteEndpoint, Notification, RemoteRejection};

use crate::connectivity::ConnectivityMonitor;
use crate::SyncError;

/// Reload-and-write rounds before a mutation gives up on a busy store
const COMMIT_ATTEMPTS: usize = 5;

/// Lease lifetime on top of one push timeout; the lease is renewed per push
const LEASE_GRACE: Duration = Duration::from_secs(30);

// ============================================================================
// Options and report
// ============================================================================

/// Tunables for the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Failed attempts before a change is dead-lettered; `0` means never
    pub max_retries: u32,
    /// Upper bound on a single push
    pub remote_timeout: Duration,
    /// How long `Success`/`Error` stays visible before resetting to `Idle`
    pub status_reset: Duration,
}

impl EngineOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            remote_timeout: Duration::from_secs(config.remote_timeout_secs),
            status_reset: Duration::from_millis(config.status_reset_ms),
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Summary of one sync pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub trigger: SyncTrigger,
    /// Changes sent to the remote
    pub attempted: usize,
    /// Changes the remote accepted
    pub synced: usize,
    /// Changes that failed this pass
    pub failed: usize,
    /// Failed changes that hit the retry cap or were rejected outright
    pub dead_lettered: usize,
    /// The pass stopped early on connectivity loss or shutdown
    pub interrupted: bool,
    /// Queue length after the pass
    pub remaining: usize,
    /// One entry per failed change
    pub errors: Vec<String>,
    /// Set when auto-cleanup ran
    pub cleanup: Option<CleanupReport>,
    pub duration_ms: u64,
}

impl SyncReport {
    fn new(trigger: SyncTrigger) -> Self {
        Self {
            trigger,
            attempted: 0,
            synced: 0,
            failed: 0,
            dead_lettered: 0,
            interrupted: false,
            remaining: 0,
            errors: Vec::new(),
            cleanup: None,
            duration_ms: 0,
        }
    }

    /// No failures and no early stop
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !self.interrupted
    }
}

/// "1 change synced", "2 changes synced", ...
fn changes_synced(count: usize) -> String {
    match count {
        1 => "1 change synced".to_string(),
        n => format!("{} changes synced", n),
    }
}

// ============================================================================
// In-progress guard
// ============================================================================

/// Holds the in-progress flag for the lifetime of a sync pass
struct InProgressGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InProgressGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

enum PushOutcome {
    Accepted,
    /// Worth another attempt
    Failed(String),
    /// The remote will refuse this change every time
    Rejected(String),
    Cancelled,
}

/// What the bookkeeping step changed in the stored state
struct Settled {
    dead_lettered: Vec<(ChangeId, u32)>,
    cleanup: Option<CleanupReport>,
    remaining: usize,
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Drains the pending-change queue and keeps the offline state persisted
///
/// ## Dependencies
///
/// - `cache`: snapshot/restore of the offline state
/// - `settings`: cache policy for auto-cleanup, and cache clearing
/// - `remote`: the case-management API
/// - `notifier`: user-facing notifications
/// - `connectivity`: effective online/offline state
pub struct SyncEngine {
    state: Mutex<OfflineState>,
    cache: OfflineCache,
    lease: SyncLease,
    settings: CacheSettingsManager,
    remote: Arc<dyn IRemoteEndpoint>,
    notifier: Arc<dyn INotificationService>,
    connectivity: Arc<ConnectivityMonitor>,
    options: EngineOptions,
    in_progress: AtomicBool,
    status_tx: Arc<watch::Sender<SyncStatus>>,
    status_generation: Arc<AtomicU64>,
    pending_tx: watch::Sender<usize>,
    shutdown: CancellationToken,
}

impl SyncEngine {
    /// Creates an engine with an empty state; see [`open`](Self::open)
    pub fn new(
        cache: OfflineCache,
        settings: CacheSettingsManager,
        remote: Arc<dyn IRemoteEndpoint>,
        notifier: Arc<dyn INotificationService>,
        connectivity: Arc<ConnectivityMonitor>,
        options: EngineOptions,
    ) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::Idle);
        let (pending_tx, _) = watch::channel(0);
        Self {
            state: Mutex::new(OfflineState::default()),
            lease: cache.sync_lease(),
            cache,
            settings,
            remote,
            notifier,
            connectivity,
            options,
            in_progress: AtomicBool::new(false),
            status_tx: Arc::new(status_tx),
            status_generation: Arc::new(AtomicU64::new(0)),
            pending_tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates an engine and restores the last persisted state
    pub async fn open(
        cache: OfflineCache,
        settings: CacheSettingsManager,
        remote: Arc<dyn IRemoteEndpoint>,
        notifier: Arc<dyn INotificationService>,
        connectivity: Arc<ConnectivityMonitor>,
        options: EngineOptions,
    ) -> Self {
        let engine = Self::new(cache, settings, remote, notifier, connectivity, options);
        engine.reload().await;
        engine
    }

    /// Stops in-flight passes when `token` is cancelled
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// Pushes every queued change to the remote
    ///
    /// # Errors
    /// - `SyncError::Offline` when the effective state is offline; nothing
    ///   is changed and an error notification is sent.
    /// - `SyncError::AlreadyInProgress` when a pass is running in this or
    ///   another process.
    /// - `SyncError::Cancelled` when shutdown was already requested.
    /// - `SyncError::Cache` when the offline state could not be read or
    ///   saved. Nothing is confirmed in that case; the changes stay queued.
    #[tracing::instrument(skip(self))]
    pub async fn perform_sync(&self, trigger: SyncTrigger) -> Result<SyncReport, SyncError> {
        if !self.connectivity.is_online() {
            warn!("Sync requested while offline");
            self.notify(Notification::error(
                "Sync unavailable",
                "You are offline. Changes stay queued until the connection returns.",
            ))
            .await;
            return Err(SyncError::Offline);
        }
        if self.shutdown.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let _guard = InProgressGuard::acquire(&self.in_progress).ok_or_else(|| {
            debug!("Sync already in progress");
            SyncError::AlreadyInProgress
        })?;
        if !self.lease.acquire(self.lease_ttl()).await? {
            debug!("Sync already in progress in another process");
            return Err(SyncError::AlreadyInProgress);
        }

        let result = self.run_pass(trigger).await;

        if let Err(e) = self.lease.release().await {
            warn!(error = %e, "Failed to release sync lease");
        }
        result
    }

    async fn run_pass(&self, trigger: SyncTrigger) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        self.set_status(SyncStatus::Syncing);

        if let Err(e) = self.refresh().await {
            return Err(self.fail_pass("Could not read offline data", e).await);
        }

        let mut report = SyncReport::new(trigger);
        let batch = self.state.lock().await.pending().dequeue_all();
        info!(changes = batch.len(), "Starting sync pass");

        let mut outcomes: Vec<(ChangeId, PushOutcome)> = Vec::with_capacity(batch.len());
        for change in &batch {
            if self.shutdown.is_cancelled() || !self.connectivity.is_online() {
                info!(remaining = batch.len() - report.attempted, "Sync pass interrupted");
                report.interrupted = true;
                break;
            }
            match self.lease.acquire(self.lease_ttl()).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!("Sync lease taken over by another process, stopping");
                    report.interrupted = true;
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to renew sync lease, stopping");
                    report.interrupted = true;
                    break;
                }
            }

            let outcome = self.push(change).await;
            match &outcome {
                PushOutcome::Accepted => report.synced += 1,
                PushOutcome::Failed(message) | PushOutcome::Rejected(message) => {
                    report.failed += 1;
                    report.errors.push(format!("{}: {}", change.id(), message));
                }
                PushOutcome::Cancelled => {
                    report.interrupted = true;
                    info!("Sync pass cancelled by shutdown");
                    break;
                }
            }
            report.attempted += 1;
            outcomes.push((*change.id(), outcome));
        }

        let policy = self.settings.load().await;
        let max_retries = self.options.max_retries;
        let clean = report.is_clean();
        let settled = self
            .commit(|state| {
                let mut dead_lettered = Vec::new();
                for (id, outcome) in &outcomes {
                    let failure = match outcome {
                        PushOutcome::Accepted => {
                            state.complete_change(id);
                            None
                        }
                        PushOutcome::Failed(message) => state.fail_change(id, message, max_retries),
                        PushOutcome::Rejected(message) => state.reject_change(id, message),
                        PushOutcome::Cancelled => None,
                    };
                    match failure {
                        Some(FailureOutcome::DeadLettered { retry_count }) => {
                            dead_lettered.push((*id, retry_count));
                        }
                        Some(FailureOutcome::Retrying { retry_count }) => {
                            debug!(change_id = %id, retry_count, "Change will be retried");
                        }
                        None => {}
                    }
                }
                if clean {
                    state.set_last_sync(Utc::now());
                }
                let cleanup = policy
                    .auto_cleanup
                    .then(|| eviction::cleanup(state, &policy, Utc::now()));
                Ok(Settled {
                    dead_lettered,
                    cleanup,
                    remaining: state.pending().len(),
                })
            })
            .await;
        report.duration_ms = start.elapsed().as_millis() as u64;

        let settled = match settled {
            Ok(settled) => settled,
            Err(e) => return Err(self.fail_pass("Could not save offline data", e).await),
        };
        for (change_id, retry_count) in &settled.dead_lettered {
            warn!(%change_id, retry_count, "Change moved to dead letters");
        }
        report.dead_lettered = settled.dead_lettered.len();
        report.cleanup = settled.cleanup;
        report.remaining = settled.remaining;

        self.announce(&report).await;

        let status = if report.failed == 0 {
            SyncStatus::Success
        } else {
            SyncStatus::Error(format!(
                "{} of {} changes failed",
                report.failed, report.attempted
            ))
        };
        let generation = self.set_status(status);
        self.schedule_status_reset(generation);

        info!(
            synced = report.synced,
            failed = report.failed,
            dead_lettered = report.dead_lettered,
            remaining = report.remaining,
            interrupted = report.interrupted,
            duration_ms = report.duration_ms,
            "Sync pass finished"
        );

        Ok(report)
    }

    async fn push(&self, change: &PendingChange) -> PushOutcome {
        let attempt = tokio::time::timeout(self.options.remote_timeout, self.remote.push_change(change));

        tokio::select! {
            _ = self.shutdown.cancelled() => PushOutcome::Cancelled,
            result = attempt => match result {
                Ok(Ok(receipt)) => {
                    debug!(
                        change_id = %change.id(),
                        accepted_at = %receipt.accepted_at,
                        "Change accepted"
                    );
                    PushOutcome::Accepted
                }
                Ok(Err(e)) if RemoteRejection::is_rejection(&e) => {
                    warn!(change_id = %change.id(), error = %e, "Change rejected by remote");
                    PushOutcome::Rejected(format!("{:#}", e))
                }
                Ok(Err(e)) => {
                    warn!(change_id = %change.id(), error = %e, "Push failed");
                    PushOutcome::Failed(format!("{:#}", e))
                }
                Err(_) => {
                    warn!(
                        change_id = %change.id(),
                        timeout_secs = self.options.remote_timeout.as_secs(),
                        "Push timed out"
                    );
                    PushOutcome::Failed(format!(
                        "timed out after {}s",
                        self.options.remote_timeout.as_secs_f32()
                    ))
                }
            }
        }
    }

    /// Reports a pass that could not read or save the offline state
    async fn fail_pass(&self, what: &str, e: SyncError) -> SyncError {
        error!(error = %e, "{}", what);
        self.notify(Notification::error(
            "Sync incomplete",
            format!("{}: {}", what, e),
        ))
        .await;
        let generation = self.set_status(SyncStatus::Error(e.to_string()));
        self.schedule_status_reset(generation);
        e
    }

    /// Sends the user-facing summary of a pass
    ///
    /// Failures are reported for every trigger; a clean pass is only
    /// announced when the user asked for it.
    async fn announce(&self, report: &SyncReport) {
        if report.failed > 0 {
            let mut body = format!("{} synced, {} failed", report.synced, report.failed);
            if report.dead_lettered > 0 {
                body.push_str(&format!("; {} moved to dead letters", report.dead_lettered));
            }
            self.notify(Notification::error("Sync incomplete", body)).await;
        } else if report.trigger == SyncTrigger::Manual {
            let body = if report.attempted == 0 && !report.interrupted {
                "No pending changes".to_string()
            } else if report.interrupted && report.remaining > 0 {
                format!(
                    "{}; {} still queued",
                    changes_synced(report.synced),
                    report.remaining
                )
            } else {
                changes_synced(report.synced)
            };
            self.notify(Notification::sync("Sync complete", body)).await;
        }
    }

    fn lease_ttl(&self) -> Duration {
        self.options.remote_timeout + LEASE_GRACE
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Inserts or replaces a cached record; returns true if it was new
    pub async fn upsert_record(&self, record: CachedRecord) -> Result<bool, SyncError> {
        self.commit(|state| Ok(state.upsert_record(record.clone())))
            .await
    }

    /// Records a local edit and queues it for sync
    #[tracing::instrument(skip(self, payload))]
    pub async fn record_change(
        &self,
        kind: ChangeKind,
        record_id: RecordId,
        payload: serde_json::Value,
    ) -> Result<ChangeId, SyncError> {
        let (id, pending) = self
            .commit(|state| {
                let id = state.record_change(kind, record_id, payload.clone())?;
                Ok((id, state.pending().len()))
            })
            .await?;
        info!(change_id = %id, pending, "Change queued");
        Ok(id)
    }

    /// Applies and persists the user's offline-mode toggle
    ///
    /// The toggle only takes effect once it is saved.
    pub async fn set_offline_mode(&self, enabled: bool) -> Result<(), SyncError> {
        self.commit(|state| {
            state.set_offline_mode(enabled);
            Ok(())
        })
        .await?;
        self.connectivity.set_offline_mode(enabled);
        Ok(())
    }

    /// Puts every dead letter back on the queue; returns how many
    pub async fn retry_dead_letters(&self) -> Result<usize, SyncError> {
        let count = self.commit(|state| Ok(state.retry_dead_letters())).await?;
        if count > 0 {
            info!(count, "Dead letters re-queued");
        }
        Ok(count)
    }

    /// Applies the saved cache policy now
    pub async fn cleanup(&self) -> Result<CleanupReport, SyncError> {
        let policy = self.settings.load().await;
        self.commit(|state| Ok(eviction::cleanup(state, &policy, Utc::now())))
            .await
    }

    /// Replaces the in-memory state with the persisted snapshot
    ///
    /// Returns the restore warning, if any. The warning is also sent as an
    /// error notification.
    pub async fn reload(&self) -> Option<String> {
        let restored = self.cache.restore().await;
        {
            let mut state = self.state.lock().await;
            *state = restored.state;
            self.connectivity.set_offline_mode(state.offline_mode());
            self.pending_tx.send_replace(state.pending().len());
        }

        if let Some(warning) = &restored.warning {
            self.notify(Notification::error("Offline data reset", warning.clone()))
                .await;
        }
        restored.warning
    }

    /// Picks up writes made by other processes sharing the store
    ///
    /// Unlike [`reload`](Self::reload), a store that cannot be read is an
    /// error and leaves the in-memory state untouched. The queue length is
    /// only republished when it changed.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let loaded = self.cache.load().await?;
        let mut state = self.state.lock().await;

        if loaded.state.offline_mode() != state.offline_mode() {
            self.connectivity.set_offline_mode(loaded.state.offline_mode());
        }
        *state = loaded.state;

        let queued = state.pending().len();
        self.pending_tx.send_if_modified(|current| {
            if *current == queued {
                return false;
            }
            *current = queued;
            true
        });
        Ok(())
    }

    /// Clears the offline cache if `confirm` returns true
    ///
    /// The offline-mode flag is kept. Refused while a sync is running in
    /// this or another process.
    pub async fn clear_cache<F>(&self, confirm: F) -> Result<bool, SyncError>
    where
        F: FnOnce() -> bool,
    {
        let _guard =
            InProgressGuard::acquire(&self.in_progress).ok_or(SyncError::AlreadyInProgress)?;
        if !self.lease.acquire(self.lease_ttl()).await? {
            return Err(SyncError::AlreadyInProgress);
        }

        let result = self.clear_locked(confirm).await;

        if let Err(e) = self.lease.release().await {
            warn!(error = %e, "Failed to release sync lease");
        }
        result
    }

    async fn clear_locked<F>(&self, confirm: F) -> Result<bool, SyncError>
    where
        F: FnOnce() -> bool,
    {
        self.refresh().await?;
        let offline_mode = self.state.lock().await.offline_mode();

        if !self.settings.clear_cache(confirm).await? {
            return Ok(false);
        }

        if offline_mode {
            self.commit(|state| {
                *state = OfflineState::default();
                state.set_offline_mode(true);
                Ok(())
            })
            .await?;
        } else {
            *self.state.lock().await = OfflineState::default();
            self.pending_tx.send_replace(0);
        }
        Ok(true)
    }

    /// Applies `apply` to the latest stored state and writes the result back
    ///
    /// Starts over from a fresh load when another process wrote in between.
    /// The in-memory state and the queue length only change once the write
    /// succeeded; on error both still describe what is stored.
    async fn commit<T, F>(&self, mut apply: F) -> Result<T, SyncError>
    where
        T: Send,
        F: FnMut(&mut OfflineState) -> Result<T, SyncError> + Send,
    {
        let mut current = self.state.lock().await;

        for attempt in 1..=COMMIT_ATTEMPTS {
            let loaded = self.cache.load().await?;
            let mut next = loaded.state;
            let value = apply(&mut next)?;

            if self
                .cache
                .save_if_unchanged(&next, loaded.revision)
                .await?
                .is_some()
            {
                *current = next;
                self.pending_tx.send_replace(current.pending().len());
                return Ok(value);
            }
            debug!(attempt, "Offline state changed by another process, retrying");
        }

        Err(CacheError::Conflict(format!(
            "offline data changed {} times while saving",
            COMMIT_ATTEMPTS
        ))
        .into())
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn status(&self) -> SyncStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Receiver of the queue length, updated after every mutation
    pub fn subscribe_pending(&self) -> watch::Receiver<usize> {
        self.pending_tx.subscribe()
    }

    pub fn pending_count(&self) -> usize {
        *self.pending_tx.borrow()
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Copy of the current offline state
    pub async fn state(&self) -> OfflineState {
        self.state.lock().await.clone()
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.connectivity
    }

    pub fn settings(&self) -> &CacheSettingsManager {
        &self.settings
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Delivers a notification, logging delivery failures
    pub async fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!(error = %e, title = %notification.title, "Failed to deliver notification");
        }
    }

    fn set_status(&self, status: SyncStatus) -> u64 {
        let generation = self.status_generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(%status, generation, "Sync status changed");
        self.status_tx.send_replace(status);
        generation
    }

    /// Resets the status to `Idle` after the display timeout unless it has
    /// changed again in the meantime
    fn schedule_status_reset(&self, generation: u64) {
        let status_tx = Arc::clone(&self.status_tx);
        let current = Arc::clone(&self.status_generation);
        let delay = self.options.status_reset;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            status_tx.send_if_modified(|status| {
                if current.load(Ordering::Acquire) == generation && status.is_settled() {
                    *status = SyncStatus::Idle;
                    true
                } else {
                    false
                }
            });
        });
    }
}
