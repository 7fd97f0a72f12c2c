//! Offline cache
//!
//! Persists the whole [`OfflineState`] as one JSON document under
//! [`OFFLINE_DATA_KEY`]. Each snapshot replaces the previous one.
//! Restoring never fails: missing data yields an empty state, and corrupt
//! data or store failures yield an empty state plus a warning.
//!
//! Several processes may share the store. Writers that started from a
//! loaded state use [`OfflineCache::save_if_unchanged`] with the revision
//! they loaded, and reload when another process wrote in between.

use std::sync::Arc;

use lexsync_core::domain::OfflineState;
use lexsync_core::ports::IKeyValueStore;

use crate::lease::SyncLease;
use crate::CacheError;

/// Store key of the offline state document
pub const OFFLINE_DATA_KEY: &str = "offline-data";

/// Result of [`OfflineCache::restore`]
#[derive(Debug, Clone, Default)]
pub struct Restored {
    pub state: OfflineState,
    /// Set when the stored document could not be used as-is
    pub warning: Option<String>,
    /// Store version the state was read at; `None` when nothing is stored
    pub revision: Option<i64>,
}

/// Snapshot/restore of the offline state over a key-value store
#[derive(Clone)]
pub struct OfflineCache {
    store: Arc<dyn IKeyValueStore>,
}

impl OfflineCache {
    pub fn new(store: Arc<dyn IKeyValueStore>) -> Self {
        Self { store }
    }

    /// Writes the full state, replacing the previous snapshot
    pub async fn snapshot(&self, state: &OfflineState) -> Result<(), CacheError> {
        let json = serde_json::to_string(state)?;
        self.store
            .put(OFFLINE_DATA_KEY, &json)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        tracing::debug!(
            records = state.records().len(),
            pending = state.pending().len(),
            bytes = json.len(),
            "Offline state saved"
        );
        Ok(())
    }

    /// Writes `state` only if the stored snapshot is still at `revision`
    ///
    /// Returns the new revision, or `None` when another writer changed the
    /// snapshot since it was loaded.
    pub async fn save_if_unchanged(
        &self,
        state: &OfflineState,
        revision: Option<i64>,
    ) -> Result<Option<i64>, CacheError> {
        let json = serde_json::to_string(state)?;
        let written = self
            .store
            .put_if_version(OFFLINE_DATA_KEY, &json, revision)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        if let Some(revision) = written {
            tracing::debug!(
                records = state.records().len(),
                pending = state.pending().len(),
                bytes = json.len(),
                revision,
                "Offline state saved"
            );
        }
        Ok(written)
    }

    /// Loads the last snapshot, failing only when the store cannot be read
    ///
    /// Corrupt data yields an empty state at the stored revision, so the
    /// next write replaces it. A state that violates the record/queue
    /// invariants is repaired. Both cases are reported as a warning.
    pub async fn load(&self) -> Result<Restored, CacheError> {
        let stored = self
            .store
            .get_versioned(OFFLINE_DATA_KEY)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        let Some(stored) = stored else {
            tracing::debug!("No offline state stored, starting empty");
            return Ok(Restored::default());
        };
        let revision = Some(stored.version);

        let mut state: OfflineState = match serde_json::from_str(&stored.value) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "Offline data is corrupt, starting empty");
                return Ok(Restored {
                    state: OfflineState::default(),
                    warning: Some(format!("Offline data is corrupt and was discarded: {}", e)),
                    revision,
                });
            }
        };

        let fixes = state.repair();
        let warning = if fixes > 0 {
            tracing::warn!(fixes, "Repaired inconsistent offline data");
            Some(format!("Repaired {} inconsistencies in offline data", fixes))
        } else {
            None
        };

        tracing::debug!(
            records = state.records().len(),
            pending = state.pending().len(),
            dead_letters = state.dead_letters().len(),
            revision = stored.version,
            "Offline state loaded"
        );

        Ok(Restored {
            state,
            warning,
            revision,
        })
    }

    /// Loads the last snapshot, falling back to an empty state
    pub async fn restore(&self) -> Restored {
        match self.load().await {
            Ok(restored) => {
                tracing::info!(
                    records = restored.state.records().len(),
                    pending = restored.state.pending().len(),
                    "Offline state restored"
                );
                restored
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read offline data, starting empty");
                Restored {
                    warning: Some(format!("Failed to read offline data: {}", e)),
                    ..Restored::default()
                }
            }
        }
    }

    /// Lease that keeps sync passes of several processes apart
    pub fn sync_lease(&self) -> SyncLease {
        SyncLease::new(self.store.clone())
    }

    /// Deletes the stored snapshot
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store
            .delete(OFFLINE_DATA_KEY)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        tracing::info!("Offline cache cleared");
        Ok(())
    }
}
