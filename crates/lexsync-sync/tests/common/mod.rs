//! Shared fixtures for sync engine and scheduler tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use lexsync_cache::{
    CacheSettingsManager, DatabasePool, OfflineCache, SqliteKeyValueStore, OFFLINE_DATA_KEY,
};
use lexsync_core::domain::{
    CachePolicy, CachedRecord, CaseDetails, CaseNumber, ConnectivityState, PendingChange, RecordId,
};
use lexsync_core::ports::{
    IKeyValueStore, INotificationService, IRemoteEndpoint, Notification, PushReceipt,
    RemoteRejection, Versioned,
};
use lexsync_sync::{ConnectivityMonitor, EngineOptions, SyncEngine};

// ============================================================================
// Mock remote
// ============================================================================

/// Remote that accepts everything except changes for rejected records
///
/// `reject` fails with a retryable server error; `refuse` fails with a
/// permanent rejection.
#[derive(Default)]
pub struct MockRemote {
    rejected: Mutex<HashSet<RecordId>>,
    refused: Mutex<HashSet<RecordId>>,
    delay: Mutex<Option<Duration>>,
    pushed: Mutex<Vec<PendingChange>>,
    pushed_at: Mutex<Vec<Instant>>,
    probes: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reject(&self, record: RecordId) {
        self.rejected.lock().unwrap().insert(record);
    }

    pub fn refuse(&self, record: RecordId) {
        self.refused.lock().unwrap().insert(record);
    }

    pub fn accept(&self, record: &RecordId) {
        self.rejected.lock().unwrap().remove(record);
        self.refused.lock().unwrap().remove(record);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn pushed(&self) -> Vec<PendingChange> {
        self.pushed.lock().unwrap().clone()
    }

    pub fn push_count(&self) -> usize {
        self.pushed.lock().unwrap().len()
    }

    /// When each push arrived, in order
    pub fn push_times(&self) -> Vec<Instant> {
        self.pushed_at.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IRemoteEndpoint for MockRemote {
    async fn push_change(&self, change: &PendingChange) -> anyhow::Result<PushReceipt> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.pushed.lock().unwrap().push(change.clone());
        self.pushed_at.lock().unwrap().push(Instant::now());

        if self.refused.lock().unwrap().contains(change.record_id()) {
            return Err(RemoteRejection("Not found: HTTP 404".into()).into());
        }
        if self.rejected.lock().unwrap().contains(change.record_id()) {
            anyhow::bail!("Server error: HTTP 503")
        }
        Ok(PushReceipt {
            change_id: *change.id(),
            accepted_at: Utc::now(),
        })
    }

    async fn probe(&self) -> anyhow::Result<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Recording notifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn in_category(&self, category: &str) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.category == category)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl INotificationService for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

// ============================================================================
// Flaky store
// ============================================================================

/// SQLite store whose offline-state writes can be made to fail
pub struct FlakyStore {
    inner: SqliteKeyValueStore,
    fail_state_writes: AtomicBool,
}

impl FlakyStore {
    pub async fn new() -> Arc<Self> {
        let pool = DatabasePool::in_memory()
            .await
            .expect("Failed to create in-memory database");
        Arc::new(Self {
            inner: SqliteKeyValueStore::new(pool.pool().clone()),
            fail_state_writes: AtomicBool::new(false),
        })
    }

    pub fn fail_state_writes(&self, fail: bool) {
        self.fail_state_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self, key: &str) -> anyhow::Result<()> {
        if key == OFFLINE_DATA_KEY && self.fail_state_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk full")
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl IKeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn get_versioned(&self, key: &str) -> anyhow::Result<Option<Versioned>> {
        self.inner.get_versioned(key).await
    }

    async fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.check(key)?;
        self.inner.put(key, value).await
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: &str,
        expected: Option<i64>,
    ) -> anyhow::Result<Option<i64>> {
        self.check(key)?;
        self.inner.put_if_version(key, value, expected).await
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.check(key)?;
        self.inner.delete(key).await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: Arc<SyncEngine>,
    pub remote: Arc<MockRemote>,
    pub notifier: Arc<RecordingNotifier>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub cache: OfflineCache,
    pub shutdown: CancellationToken,
}

pub fn fast_options() -> EngineOptions {
    EngineOptions {
        max_retries: 3,
        remote_timeout: Duration::from_secs(2),
        status_reset: Duration::from_millis(50),
    }
}

pub async fn harness() -> Harness {
    harness_with(fast_options(), CachePolicy::default()).await
}

pub async fn harness_with(options: EngineOptions, policy: CachePolicy) -> Harness {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    let store = Arc::new(SqliteKeyValueStore::new(pool.pool().clone()));
    harness_over(store, options, policy).await
}

/// Engine over the database file at `path`, as a separate process would open it
pub async fn harness_on_file(path: &Path) -> Harness {
    let pool = DatabasePool::new(path)
        .await
        .expect("Failed to open database file");
    let store = Arc::new(SqliteKeyValueStore::new(pool.pool().clone()));
    harness_over(store, fast_options(), CachePolicy::default()).await
}

pub async fn harness_over(
    store: Arc<dyn IKeyValueStore>,
    options: EngineOptions,
    policy: CachePolicy,
) -> Harness {
    let cache = OfflineCache::new(store.clone());
    let settings = CacheSettingsManager::new(store, cache.clone(), policy);

    let remote = MockRemote::new();
    let notifier = RecordingNotifier::new();
    let connectivity = Arc::new(ConnectivityMonitor::new(ConnectivityState::Online));
    let shutdown = CancellationToken::new();

    let engine = SyncEngine::open(
        cache.clone(),
        settings,
        remote.clone(),
        notifier.clone(),
        connectivity.clone(),
        options,
    )
    .await
    .with_shutdown(shutdown.clone());

    Harness {
        engine: Arc::new(engine),
        remote,
        notifier,
        connectivity,
        cache,
        shutdown,
    }
}

pub fn case(number: &str) -> CachedRecord {
    CachedRecord::new(CaseDetails::new(
        CaseNumber::new(number).unwrap(),
        "Wanjiru v. Attorney General",
        "active",
    ))
}

/// Inserts a record through the engine and returns its ID
pub async fn seed(h: &Harness, number: &str) -> RecordId {
    let record = case(number);
    let id = *record.id();
    h.engine.upsert_record(record).await.unwrap();
    id
}
