//! OfflineState aggregate
//!
//! The offline state is the whole object persisted by the offline cache:
//! records, the pending queue, dead letters, the last successful sync time,
//! and the user's offline-mode flag. Every mutation goes through this type so
//! two invariants always hold:
//!
//! - every pending change references an existing record;
//! - a record is `pending` iff at least one pending change references it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::change::{ChangeKind, PendingChange};
use super::errors::DomainError;
use super::newtypes::{ChangeId, RecordId};
use super::queue::PendingChangeQueue;
use super::record::{CachedRecord, CaseDetails, RecordSyncStatus};

/// What happened to a change after a failed sync attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The change stays queued for the next pass
    Retrying { retry_count: u32 },
    /// The change hit the retry cap and moved to the dead-letter list
    DeadLettered { retry_count: u32 },
}

/// Snapshot of everything the app keeps offline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineState {
    #[serde(default)]
    records: Vec<CachedRecord>,
    #[serde(default)]
    pending: PendingChangeQueue,
    #[serde(default)]
    dead_letters: Vec<PendingChange>,
    #[serde(default)]
    last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    offline_mode: bool,
}

impl OfflineState {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Records ---

    pub fn records(&self) -> &[CachedRecord] {
        &self.records
    }

    pub fn record(&self, id: &RecordId) -> Option<&CachedRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Inserts a record or replaces the one with the same ID
    ///
    /// The stored status is recomputed from the queue, so replacing a record
    /// that still has pending changes keeps it `pending`. Returns true when
    /// the record was newly inserted.
    pub fn upsert_record(&mut self, record: CachedRecord) -> bool {
        let id = *record.id();
        let inserted = match self.records.iter_mut().find(|r| r.id() == &id) {
            Some(existing) => {
                *existing = record;
                false
            }
            None => {
                self.records.push(record);
                true
            }
        };
        self.refresh_record_status(&id);
        inserted
    }

    /// Removes a record together with every change that references it
    pub fn remove_record(&mut self, id: &RecordId) -> Option<CachedRecord> {
        let index = self.records.iter().position(|r| r.id() == id)?;
        self.pending.retain_records(|rid| rid != id);
        self.dead_letters.retain(|c| c.record_id() != id);
        Some(self.records.remove(index))
    }

    // --- Pending changes ---

    pub fn pending(&self) -> &PendingChangeQueue {
        &self.pending
    }

    /// Creates a change for a record, queues it, and marks the record pending
    ///
    /// `case_update` payloads carrying string `title` or `status` fields are
    /// applied to the local copy right away so the working view reflects the
    /// edit before the remote confirms it.
    ///
    /// # Errors
    /// Returns `DomainError::RecordNotFound` if the record is not cached.
    pub fn record_change(
        &mut self,
        kind: ChangeKind,
        record_id: RecordId,
        payload: serde_json::Value,
    ) -> Result<ChangeId, DomainError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id() == &record_id)
            .ok_or_else(|| DomainError::RecordNotFound(record_id.to_string()))?;

        if kind == ChangeKind::CaseUpdate {
            let mut details: CaseDetails = record.details().clone();
            if let Some(title) = payload.get("title").and_then(|v| v.as_str()) {
                details.title = title.to_string();
            }
            if let Some(status) = payload.get("status").and_then(|v| v.as_str()) {
                details.status = status.to_string();
            }
            record.update_details(details);
        } else {
            record.touch();
        }
        record.mark_pending();

        let change = PendingChange::new(kind, record_id, payload);
        let id = *change.id();
        self.pending.enqueue(change);
        Ok(id)
    }

    /// Removes a confirmed change and marks its record synced when no other
    /// change still references it
    pub fn complete_change(&mut self, id: &ChangeId) -> Option<PendingChange> {
        let change = self.pending.remove(id)?;
        self.refresh_record_status(change.record_id());
        Some(change)
    }

    /// Records a failed attempt for a queued change
    ///
    /// When `max_retries` is non-zero and the retry count reaches it, the
    /// change moves to the dead-letter list and its record is marked `error`
    /// unless other changes still reference it. Returns `None` if the change
    /// is not queued.
    pub fn fail_change(
        &mut self,
        id: &ChangeId,
        error: &str,
        max_retries: u32,
    ) -> Option<FailureOutcome> {
        let retry_count = self.pending.record_failure(id, error)?;

        if max_retries == 0 || retry_count < max_retries {
            return Some(FailureOutcome::Retrying { retry_count });
        }
        self.dead_letter(id, error, retry_count)
    }

    /// Records a failed attempt the remote will repeat on every retry
    ///
    /// The change moves to the dead-letter list right away, whatever the
    /// retry cap. Returns `None` if the change is not queued.
    pub fn reject_change(&mut self, id: &ChangeId, error: &str) -> Option<FailureOutcome> {
        let retry_count = self.pending.record_failure(id, error)?;
        self.dead_letter(id, error, retry_count)
    }

    fn dead_letter(&mut self, id: &ChangeId, error: &str, retry_count: u32) -> Option<FailureOutcome> {
        let change = self.pending.remove(id)?;
        let record_id = *change.record_id();
        self.dead_letters.push(change);

        let still_referenced = self.pending.references(&record_id);
        if let Some(record) = self.records.iter_mut().find(|r| r.id() == &record_id) {
            if still_referenced {
                record.mark_pending();
            } else {
                record.mark_error(error);
            }
        }

        Some(FailureOutcome::DeadLettered { retry_count })
    }

    // --- Dead letters ---

    pub fn dead_letters(&self) -> &[PendingChange] {
        &self.dead_letters
    }

    /// Moves every dead letter back onto the queue with a fresh retry counter
    ///
    /// Returns the number of changes re-queued.
    pub fn retry_dead_letters(&mut self) -> usize {
        let letters = std::mem::take(&mut self.dead_letters);
        let count = letters.len();
        for mut change in letters {
            change.reset_retries();
            let record_id = *change.record_id();
            self.pending.enqueue(change);
            self.refresh_record_status(&record_id);
        }
        count
    }

    /// Drops dead letters created before `cutoff`
    pub fn prune_dead_letters_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.dead_letters.len();
        self.dead_letters.retain(|c| c.timestamp() >= cutoff);
        before - self.dead_letters.len()
    }

    // --- Bookkeeping ---

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn set_last_sync(&mut self, at: DateTime<Utc>) {
        self.last_sync = Some(at);
    }

    pub fn offline_mode(&self) -> bool {
        self.offline_mode
    }

    pub fn set_offline_mode(&mut self, enabled: bool) {
        self.offline_mode = enabled;
    }

    /// Size of the JSON encoding of this state, in bytes
    pub fn serialized_size(&self) -> u64 {
        serde_json::to_vec(self)
            .map(|bytes| bytes.len() as u64)
            .unwrap_or(0)
    }

    /// Restores both invariants on a state loaded from storage
    ///
    /// Drops changes and dead letters whose record is missing and recomputes
    /// every record status from the queue. Returns the number of fixes made.
    pub fn repair(&mut self) -> usize {
        let known: Vec<RecordId> = self.records.iter().map(|r| *r.id()).collect();

        let mut fixes = self.pending.retain_records(|id| known.contains(id));
        let letters_before = self.dead_letters.len();
        self.dead_letters
            .retain(|c| known.contains(c.record_id()));
        fixes += letters_before - self.dead_letters.len();

        for record in &mut self.records {
            let referenced = self.pending.references(record.id());
            match (referenced, record.sync_status()) {
                (true, RecordSyncStatus::Pending) => {}
                (true, _) => {
                    record.mark_pending();
                    fixes += 1;
                }
                (false, RecordSyncStatus::Pending) => {
                    record.mark_synced();
                    fixes += 1;
                }
                (false, _) => {}
            }
        }

        fixes
    }

    fn refresh_record_status(&mut self, id: &RecordId) {
        let referenced = self.pending.references(id);
        if let Some(record) = self.records.iter_mut().find(|r| r.id() == id) {
            if referenced {
                record.mark_pending();
            } else if record.sync_status() == RecordSyncStatus::Pending {
                record.mark_synced();
            }
        }
    }
}
