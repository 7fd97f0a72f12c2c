//! Remote endpoint port (driven/secondary port)
//!
//! The remote is the case-management server. The sync engine pushes each
//! pending change to it individually and treats any error as a failed
//! attempt for that change alone.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result`; the engine records the error message.
//! - A [`RemoteRejection`] inside the error marks a failure that retrying
//!   cannot fix. The engine dead-letters such changes at once.
//! - `probe` is used by the connectivity probe to decide reachability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::change::PendingChange;
use crate::domain::newtypes::ChangeId;

/// Confirmation returned by the remote for an accepted change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReceipt {
    /// ID of the accepted change, echoed back by the remote
    #[serde(rename = "id")]
    pub change_id: ChangeId,
    /// When the remote stored the change
    pub accepted_at: DateTime<Utc>,
}

/// Failure the remote will repeat for this change on every attempt
///
/// Adapters return it for rejections such as a missing record or a
/// permission error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Rejected by remote: {0}")]
pub struct RemoteRejection(pub String);

impl RemoteRejection {
    /// Returns true if `error` carries a `RemoteRejection` anywhere in its chain
    pub fn is_rejection(error: &anyhow::Error) -> bool {
        error.chain().any(|cause| cause.is::<RemoteRejection>())
    }
}

/// Port trait for the remote case-management API
#[async_trait::async_trait]
pub trait IRemoteEndpoint: Send + Sync {
    /// Sends a single pending change
    ///
    /// Returns an error for any transport failure, timeout, or non-success
    /// response. The caller keeps the change queued on error unless the
    /// error is a [`RemoteRejection`].
    async fn push_change(&self, change: &PendingChange) -> anyhow::Result<PushReceipt>;

    /// Checks whether the remote is reachable
    async fn probe(&self) -> anyhow::Result<()>;
}
