//! Cross-process sync lease
//!
//! The CLI and the daemon may open the same database. A sync pass holds the
//! lease stored under [`SYNC_LEASE_KEY`] so two processes never push the same
//! queue at once. Leases expire on their own: a process that dies mid-pass
//! blocks others only until `expires_at`.
//!
//! ```text
//! (free) ── acquire() ──→ held ── release() ──→ (free)
//!                          │
//!                    acquire() again extends
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lexsync_core::ports::IKeyValueStore;

use crate::CacheError;

/// Store key of the sync lease document
pub const SYNC_LEASE_KEY: &str = "sync-lease";

/// Persisted form of the lease
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaseData {
    holder: Uuid,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl LeaseData {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// One holder's handle on the shared sync lease
pub struct SyncLease {
    store: Arc<dyn IKeyValueStore>,
    holder: Uuid,
}

impl SyncLease {
    /// Creates a handle with a fresh holder ID
    pub fn new(store: Arc<dyn IKeyValueStore>) -> Self {
        Self {
            store,
            holder: Uuid::new_v4(),
        }
    }

    pub fn holder(&self) -> Uuid {
        self.holder
    }

    /// Takes the lease, or extends it if this handle already holds it
    ///
    /// Returns `false` while another holder's lease is live or when another
    /// holder took it concurrently.
    pub async fn acquire(&self, ttl: Duration) -> Result<bool, CacheError> {
        let now = Utc::now();
        let current = self
            .store
            .get_versioned(SYNC_LEASE_KEY)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        let (expected, acquired_at) = match &current {
            None => (None, now),
            Some(stored) => match serde_json::from_str::<LeaseData>(&stored.value) {
                Ok(lease) if lease.holder == self.holder => (Some(stored.version), lease.acquired_at),
                Ok(lease) if !lease.is_expired(now) => {
                    tracing::debug!(
                        holder = %lease.holder,
                        expires_at = %lease.expires_at,
                        "Sync lease held elsewhere"
                    );
                    return Ok(false);
                }
                Ok(_) => (Some(stored.version), now),
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable sync lease, taking it over");
                    (Some(stored.version), now)
                }
            },
        };

        let lease = LeaseData {
            holder: self.holder,
            acquired_at,
            expires_at: expiry(now, ttl),
        };
        let json = serde_json::to_string(&lease)?;
        let written = self
            .store
            .put_if_version(SYNC_LEASE_KEY, &json, expected)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        if written.is_some() {
            tracing::trace!(holder = %self.holder, expires_at = %lease.expires_at, "Sync lease held");
        }
        Ok(written.is_some())
    }

    /// Gives the lease up if this handle still holds it
    pub async fn release(&self) -> Result<(), CacheError> {
        let current = self
            .store
            .get_versioned(SYNC_LEASE_KEY)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        let Some(stored) = current else {
            return Ok(());
        };
        let Ok(lease) = serde_json::from_str::<LeaseData>(&stored.value) else {
            return Ok(());
        };
        if lease.holder != self.holder {
            return Ok(());
        }

        let released = LeaseData {
            expires_at: Utc::now(),
            ..lease
        };
        let json = serde_json::to_string(&released)?;
        self.store
            .put_if_version(SYNC_LEASE_KEY, &json, Some(stored.version))
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        tracing::trace!(holder = %self.holder, "Sync lease released");
        Ok(())
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
