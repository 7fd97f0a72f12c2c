//! Policy-driven eviction
//!
//! Removes synced records that have outlived the retention window, then
//! evicts the oldest synced records while the serialized state exceeds the
//! size limit. Records with pending changes or in error are never evicted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use lexsync_core::domain::{CachePolicy, OfflineState, RecordId, RecordSyncStatus};

/// What a cleanup pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Records older than the retention window
    pub expired_records: usize,
    /// Records evicted to get under the size limit
    pub evicted_for_size: usize,
    /// Dead letters older than the retention window
    pub dropped_dead_letters: usize,
    /// Serialized size after cleanup
    pub size_bytes: u64,
}

impl CleanupReport {
    pub fn removed_anything(&self) -> bool {
        self.expired_records + self.evicted_for_size + self.dropped_dead_letters > 0
    }
}

/// Applies `policy` to `state` as of `now`
pub fn cleanup(state: &mut OfflineState, policy: &CachePolicy, now: DateTime<Utc>) -> CleanupReport {
    let mut report = CleanupReport::default();
    // A window reaching past the earliest representable time expires nothing
    if let Some(cutoff) = now.checked_sub_signed(policy.retention()) {
        let expired: Vec<RecordId> = evictable(state)
            .filter(|(_, modified)| *modified < cutoff)
            .map(|(id, _)| id)
            .collect();
        for id in &expired {
            if state.remove_record(id).is_some() {
                report.expired_records += 1;
            }
        }

        report.dropped_dead_letters = state.prune_dead_letters_before(cutoff);
    }

    let mut size = state.serialized_size();
    if size > policy.max_size_bytes {
        let mut candidates: Vec<(RecordId, DateTime<Utc>)> = evictable(state).collect();
        candidates.sort_by_key(|(_, modified)| *modified);

        for (id, _) in candidates {
            if size <= policy.max_size_bytes {
                break;
            }
            if state.remove_record(&id).is_some() {
                report.evicted_for_size += 1;
                size = state.serialized_size();
            }
        }

        if size > policy.max_size_bytes {
            tracing::warn!(
                size,
                limit = policy.max_size_bytes,
                "Cache still over size limit; remaining records have unsynced changes"
            );
        }
    }

    report.size_bytes = size;

    if report.removed_anything() {
        tracing::info!(
            expired = report.expired_records,
            evicted = report.evicted_for_size,
            dead_letters = report.dropped_dead_letters,
            size_bytes = report.size_bytes,
            "Cache cleanup finished"
        );
    }

    report
}

/// Synced records with no queued changes, with their modification time
fn evictable(state: &OfflineState) -> impl Iterator<Item = (RecordId, DateTime<Utc>)> + '_ {
    state
        .records()
        .iter()
        .filter(|r| r.sync_status() == RecordSyncStatus::Synced)
        .filter(|r| !state.pending().references(r.id()))
        .map(|r| (*r.id(), r.last_modified()))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use lexsync_core::domain::{CachedRecord, CaseDetails, CaseNumber, ChangeKind};

    use super::*;

    fn aged_record(number: &str, age_days: i64) -> CachedRecord {
        CachedRecord::with_id(
            RecordId::new(),
            CaseDetails::new(CaseNumber::new(number).unwrap(), "Re Estate", "closed"),
            Utc::now() - Duration::days(age_days),
        )
    }

    #[test]
    fn test_expires_old_synced_records() {
        let old = aged_record("PROB/1", 40);
        let fresh = aged_record("PROB/2", 1);
        let mut state = OfflineState::new();
        state.upsert_record(old.clone());
        state.upsert_record(fresh.clone());

        let report = cleanup(&mut state, &CachePolicy::new(100, 30, true), Utc::now());

        assert_eq!(report.expired_records, 1);
        assert!(state.record(old.id()).is_none());
        assert!(state.record(fresh.id()).is_some());
    }

    #[test]
    fn test_never_evicts_pending_records() {
        let old = aged_record("PROB/3", 400);
        let mut state = OfflineState::new();
        state.upsert_record(old.clone());
        state
            .record_change(ChangeKind::CaseNote, *old.id(), serde_json::json!({}))
            .unwrap();

        // record_change touches the record; age it again through upsert
        state.upsert_record(CachedRecord::with_id(
            *old.id(),
            old.details().clone(),
            Utc::now() - Duration::days(400),
        ));

        let policy = CachePolicy {
            max_size_bytes: 1,
            retention_days: 7,
            auto_cleanup: true,
        };
        let report = cleanup(&mut state, &policy, Utc::now());

        assert_eq!(report.expired_records, 0);
        assert_eq!(report.evicted_for_size, 0);
        assert!(state.record(old.id()).is_some());
        assert_eq!(state.pending().len(), 1);
    }

    #[test]
    fn test_size_limit_evicts_oldest_first() {
        let mut state = OfflineState::new();
        let oldest = aged_record("PROB/4", 5);
        let middle = aged_record("PROB/5", 3);
        let newest = aged_record("PROB/6", 1);
        state.upsert_record(newest.clone());
        state.upsert_record(oldest.clone());
        state.upsert_record(middle.clone());

        let mut single = OfflineState::new();
        single.upsert_record(newest.clone());
        let limit = single.serialized_size();

        let policy = CachePolicy {
            max_size_bytes: limit,
            retention_days: 365,
            auto_cleanup: true,
        };
        let report = cleanup(&mut state, &policy, Utc::now());

        assert_eq!(report.evicted_for_size, 2);
        assert!(state.record(newest.id()).is_some());
        assert!(report.size_bytes <= limit);
    }

    #[test]
    fn test_huge_retention_expires_nothing() {
        let ancient = aged_record("PROB/8", 36_500);
        let mut state = OfflineState::new();
        state.upsert_record(ancient.clone());

        let policy = CachePolicy::new(100, u32::MAX, true);
        let report = cleanup(&mut state, &policy, Utc::now());

        assert_eq!(report.expired_records, 0);
        assert_eq!(report.dropped_dead_letters, 0);
        assert!(state.record(ancient.id()).is_some());
    }

    #[test]
    fn test_noop_within_limits() {
        let mut state = OfflineState::new();
        state.upsert_record(aged_record("PROB/7", 2));

        let report = cleanup(&mut state, &CachePolicy::default(), Utc::now());
        assert!(!report.removed_anything());
        assert_eq!(state.records().len(), 1);
    }
}
