//! CachedRecord domain entity
//!
//! A cached record is the local working copy of a case. The offline state
//! owns all records; the sync engine flips their status as pending changes
//! are confirmed or fail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{CaseNumber, RecordId};

/// Synchronization status of a single cached record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSyncStatus {
    /// Local copy matches what the remote has confirmed
    Synced,
    /// At least one pending change references this record
    Pending,
    /// A change for this record was dead-lettered
    Error,
}

impl RecordSyncStatus {
    /// Returns the status name as stored and displayed
    pub fn name(&self) -> &'static str {
        match self {
            RecordSyncStatus::Synced => "synced",
            RecordSyncStatus::Pending => "pending",
            RecordSyncStatus::Error => "error",
        }
    }
}

impl Default for RecordSyncStatus {
    fn default() -> Self {
        RecordSyncStatus::Synced
    }
}

impl std::fmt::Display for RecordSyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Case payload carried by a cached record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetails {
    /// Court-assigned case number
    pub case_number: CaseNumber,
    /// Short human-readable title, e.g. "Mwangi v. Republic"
    pub title: String,
    /// Free-form case status, e.g. "active", "adjourned", "closed"
    pub status: String,
}

impl CaseDetails {
    pub fn new(case_number: CaseNumber, title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            case_number,
            title: title.into(),
            status: status.into(),
        }
    }
}

/// A case record held in the offline cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRecord {
    id: RecordId,
    details: CaseDetails,
    last_modified: DateTime<Utc>,
    sync_status: RecordSyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

impl CachedRecord {
    /// Creates a new record in `Synced` state with a fresh ID
    pub fn new(details: CaseDetails) -> Self {
        Self::with_id(RecordId::new(), details, Utc::now())
    }

    /// Creates a record with a known ID and modification time
    pub fn with_id(id: RecordId, details: CaseDetails, last_modified: DateTime<Utc>) -> Self {
        Self {
            id,
            details,
            last_modified,
            sync_status: RecordSyncStatus::Synced,
            last_error: None,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn details(&self) -> &CaseDetails {
        &self.details
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn sync_status(&self) -> RecordSyncStatus {
        self.sync_status
    }

    /// Message of the last dead-lettered change, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replaces the case payload and bumps `last_modified`
    pub fn update_details(&mut self, details: CaseDetails) {
        self.details = details;
        self.touch();
    }

    /// Bumps `last_modified` to now
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    pub fn mark_pending(&mut self) {
        self.sync_status = RecordSyncStatus::Pending;
    }

    /// Marks the record as confirmed by the remote and clears any error
    pub fn mark_synced(&mut self) {
        self.sync_status = RecordSyncStatus::Synced;
        self.last_error = None;
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.sync_status = RecordSyncStatus::Error;
        self.last_error = Some(message.into());
    }
}
