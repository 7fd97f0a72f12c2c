//! Cache policy
//!
//! User-editable limits on how much and how long data is kept locally.
//! Values are not range-checked; front ends offer the option sets below.

use serde::{Deserialize, Serialize};

/// Cache size choices offered to the user, in megabytes
pub const SIZE_OPTIONS_MB: &[u64] = &[50, 100, 250, 500, 1024];

/// Retention choices offered to the user, in days
pub const RETENTION_OPTIONS_DAYS: &[u32] = &[7, 14, 30, 90, 365];

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Limits governing the offline cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePolicy {
    /// Upper bound on the serialized offline snapshot
    pub max_size_bytes: u64,
    /// Synced records untouched for longer than this are evicted
    pub retention_days: u32,
    /// Whether eviction runs automatically after each sync
    pub auto_cleanup: bool,
}

impl CachePolicy {
    pub fn new(max_size_mb: u64, retention_days: u32, auto_cleanup: bool) -> Self {
        Self {
            max_size_bytes: max_size_mb.saturating_mul(BYTES_PER_MB),
            retention_days,
            auto_cleanup,
        }
    }

    /// Size limit in whole megabytes
    pub fn max_size_mb(&self) -> u64 {
        self.max_size_bytes / BYTES_PER_MB
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(100, 30, true)
    }
}
