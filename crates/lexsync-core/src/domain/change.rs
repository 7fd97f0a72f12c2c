//! PendingChange domain entity
//!
//! A pending change is a local mutation that the remote has not yet
//! confirmed. Changes are created whenever a record is edited, whether the
//! app is online or offline, and leave the queue once the remote accepts them.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{ChangeId, RecordId};

/// Kind of mutation a pending change carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Edit to case fields (title, status, parties, ...)
    CaseUpdate,
    /// A document attached to the case while offline
    DocumentUpload,
    /// A note added to the case file
    CaseNote,
}

impl ChangeKind {
    /// Wire name, e.g. `case_update`
    pub fn name(&self) -> &'static str {
        match self {
            ChangeKind::CaseUpdate => "case_update",
            ChangeKind::DocumentUpload => "document_upload",
            ChangeKind::CaseNote => "case_note",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ChangeKind {
    type Err = DomainError;

    /// Accepts both `case_update` and `case-update` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "case_update" => Ok(ChangeKind::CaseUpdate),
            "document_upload" => Ok(ChangeKind::DocumentUpload),
            "case_note" => Ok(ChangeKind::CaseNote),
            _ => Err(DomainError::UnknownChangeKind(s.to_string())),
        }
    }
}

/// A locally recorded mutation awaiting confirmation from the remote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    id: ChangeId,
    #[serde(rename = "type")]
    kind: ChangeKind,
    record_id: RecordId,
    payload: serde_json::Value,
    timestamp: DateTime<Utc>,
    retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

impl PendingChange {
    /// Creates a new change stamped with the current time
    pub fn new(kind: ChangeKind, record_id: RecordId, payload: serde_json::Value) -> Self {
        Self {
            id: ChangeId::new(),
            kind,
            record_id,
            payload,
            timestamp: Utc::now(),
            retry_count: 0,
            last_error: None,
        }
    }

    pub fn id(&self) -> &ChangeId {
        &self.id
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Records a failed sync attempt and returns the new retry count
    pub fn record_failure(&mut self, error: impl Into<String>) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(error.into());
        self.retry_count
    }

    /// Clears the retry counter, used when a dead letter is re-queued
    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
        self.last_error = None;
    }
}
