//! Ordered queue of pending changes
//!
//! Insertion order is preserved for display. A sync pass takes the whole
//! batch from [`PendingChangeQueue::dequeue_all`] and confirms entries one by
//! one through [`PendingChangeQueue::remove`]; failed entries stay queued with
//! an incremented retry counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::change::PendingChange;
use super::newtypes::{ChangeId, RecordId};

/// FIFO list of changes awaiting sync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingChangeQueue {
    changes: Vec<PendingChange>,
}

impl PendingChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a change to the back of the queue
    pub fn enqueue(&mut self, change: PendingChange) {
        self.changes.push(change);
    }

    /// Returns the current batch in insertion order
    ///
    /// Entries are not removed; they leave the queue only through
    /// [`remove`](Self::remove) once the remote has accepted them, so a
    /// failed pass never loses work.
    pub fn dequeue_all(&self) -> Vec<PendingChange> {
        self.changes.clone()
    }

    /// Removes a change by ID, returning it if present
    pub fn remove(&mut self, id: &ChangeId) -> Option<PendingChange> {
        let index = self.changes.iter().position(|c| c.id() == id)?;
        Some(self.changes.remove(index))
    }

    pub fn get(&self, id: &ChangeId) -> Option<&PendingChange> {
        self.changes.iter().find(|c| c.id() == id)
    }

    /// Increments the retry counter of a change and returns the new count
    pub fn record_failure(&mut self, id: &ChangeId, error: impl Into<String>) -> Option<u32> {
        self.changes
            .iter_mut()
            .find(|c| c.id() == id)
            .map(|c| c.record_failure(error))
    }

    /// Returns true if any queued change targets the given record
    pub fn references(&self, record_id: &RecordId) -> bool {
        self.changes.iter().any(|c| c.record_id() == record_id)
    }

    /// Drops every change whose record is not accepted by `keep`
    ///
    /// Returns the number of changes removed.
    pub fn retain_records<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&RecordId) -> bool,
    {
        let before = self.changes.len();
        self.changes.retain(|c| keep(c.record_id()));
        before - self.changes.len()
    }

    /// Timestamp of the most recently enqueued change
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.changes.iter().map(|c| c.timestamp()).max()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
