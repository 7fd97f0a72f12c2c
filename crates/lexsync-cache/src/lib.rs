//! LexSync Cache - Local state persistence
//!
//! SQLite-backed storage for:
//! - The offline state snapshot (records, pending changes, dead letters)
//! - The user's cache policy
//!
//! ## Architecture
//!
//! This crate implements the `IKeyValueStore` port from `lexsync-core`
//! using SQLite, and builds the offline cache, eviction, and settings
//! manager on top of that port.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteKeyValueStore`] - `IKeyValueStore` implementation
//! - [`OfflineCache`] - Snapshot/restore of the whole `OfflineState`
//! - [`CacheSettingsManager`] - Persisted `CachePolicy` and cache clearing
//! - [`eviction::cleanup`] - Retention and size-based eviction
//! - [`SyncLease`] - Cross-process guard for sync passes
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use lexsync_cache::{DatabasePool, OfflineCache, SqliteKeyValueStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/lexsync/lexsync.db")).await?;
//! let store = Arc::new(SqliteKeyValueStore::new(pool.pool().clone()));
//! let cache = OfflineCache::new(store);
//! let restored = cache.restore().await;
//! # Ok(())
//! # }
//! ```

pub mod eviction;
pub mod lease;
pub mod offline_cache;
pub mod pool;
pub mod settings;
pub mod store;

pub use eviction::CleanupReport;
pub use lease::{SyncLease, SYNC_LEASE_KEY};
pub use offline_cache::{OfflineCache, Restored, OFFLINE_DATA_KEY};
pub use pool::DatabasePool;
pub use settings::{CacheSettingsManager, CACHE_SETTINGS_KEY};
pub use store::SqliteKeyValueStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The key-value store rejected a read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// Other writers kept changing a document during a read-modify-write
    #[error("Write conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
