//! Cache settings manager
//!
//! Persists the user's [`CachePolicy`] under [`CACHE_SETTINGS_KEY`] and
//! guards the destructive "clear cache" action behind a confirmation.

use std::sync::Arc;

use lexsync_core::domain::CachePolicy;
use lexsync_core::ports::IKeyValueStore;

use crate::offline_cache::OfflineCache;
use crate::CacheError;

/// Store key of the cache policy document
pub const CACHE_SETTINGS_KEY: &str = "cache-settings";

/// Loads, saves, and applies the cache policy
#[derive(Clone)]
pub struct CacheSettingsManager {
    store: Arc<dyn IKeyValueStore>,
    cache: OfflineCache,
    fallback: CachePolicy,
}

impl CacheSettingsManager {
    /// Creates a manager that falls back to `fallback` when nothing valid is stored
    pub fn new(store: Arc<dyn IKeyValueStore>, cache: OfflineCache, fallback: CachePolicy) -> Self {
        Self {
            store,
            cache,
            fallback,
        }
    }

    /// Returns the stored policy, or the fallback if missing or unreadable
    pub async fn load(&self) -> CachePolicy {
        match self.store.get(CACHE_SETTINGS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(policy) => policy,
                Err(e) => {
                    tracing::warn!(error = %e, "Cache settings are corrupt, using defaults");
                    self.fallback
                }
            },
            Ok(None) => self.fallback,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cache settings, using defaults");
                self.fallback
            }
        }
    }

    pub async fn save(&self, policy: &CachePolicy) -> Result<(), CacheError> {
        let json = serde_json::to_string(policy)?;
        self.store
            .put(CACHE_SETTINGS_KEY, &json)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        tracing::info!(
            max_size_mb = policy.max_size_mb(),
            retention_days = policy.retention_days,
            auto_cleanup = policy.auto_cleanup,
            "Cache settings saved"
        );
        Ok(())
    }

    /// Loads the policy, applies `f`, saves, and returns the result
    pub async fn update<F>(&self, f: F) -> Result<CachePolicy, CacheError>
    where
        F: FnOnce(&mut CachePolicy),
    {
        let mut policy = self.load().await;
        f(&mut policy);
        self.save(&policy).await?;
        Ok(policy)
    }

    /// Clears the offline cache if `confirm` returns true
    ///
    /// Returns whether the cache was cleared. The saved policy is kept.
    pub async fn clear_cache<F>(&self, confirm: F) -> Result<bool, CacheError>
    where
        F: FnOnce() -> bool,
    {
        if !confirm() {
            tracing::debug!("Cache clear declined");
            return Ok(false);
        }
        self.cache.clear().await?;
        Ok(true)
    }
}
