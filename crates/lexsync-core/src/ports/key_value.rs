//! Key-value store port (driven/secondary port)
//!
//! The offline cache and the cache settings manager persist whole JSON
//! documents under fixed keys. Values are opaque strings to the store.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage failures are adapter-specific.
//! - `put` replaces any existing value for the key.
//! - Several processes may share one store. Read-modify-write cycles use
//!   [`get_versioned`](IKeyValueStore::get_versioned) and
//!   [`put_if_version`](IKeyValueStore::put_if_version) so a concurrent
//!   writer is detected instead of overwritten.

/// A stored value together with its write version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: String,
    /// Changes on every write; never reused for the same key
    pub version: i64,
}

/// Port trait for durable key-value storage
#[async_trait::async_trait]
pub trait IKeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Returns the value stored under `key` with its current version
    async fn get_versioned(&self, key: &str) -> anyhow::Result<Option<Versioned>>;

    /// Stores `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Stores `value` only if the key is still at `expected`
    ///
    /// `expected == None` means the key must not exist. Returns the new
    /// version, or `None` when another writer got there first.
    async fn put_if_version(
        &self,
        key: &str,
        value: &str,
        expected: Option<i64>,
    ) -> anyhow::Result<Option<i64>>;

    /// Removes `key`; removing a missing key is not an error
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}
