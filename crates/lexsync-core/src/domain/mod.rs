//! Domain entities and business logic
//!
//! This module contains the core domain types for LexSync:
//! - Newtypes for type-safe identifiers and validated case numbers
//! - Cached case records and their sync status
//! - Pending changes and the ordered queue that holds them
//! - The offline state snapshot that ties records and changes together
//! - Cache policy and process-wide sync status types
//! - Domain-specific error types

pub mod change;
pub mod errors;
pub mod newtypes;
pub mod policy;
pub mod queue;
pub mod record;
pub mod state;
pub mod status;

// Re-export commonly used types
pub use change::{ChangeKind, PendingChange};
pub use errors::DomainError;
pub use newtypes::*;
pub use policy::CachePolicy;
pub use queue::PendingChangeQueue;
pub use record::{CachedRecord, CaseDetails, RecordSyncStatus};
pub use state::{FailureOutcome, OfflineState};
pub use status::{ConnectivityState, SyncStatus, SyncTrigger};
