//! LexSync Sync - offline queue draining and connectivity handling
//!
//! Provides:
//! - Effective online/offline tracking with transition events
//! - A sync engine that drains the pending queue against the remote
//! - A debounced auto-sync scheduler with failure backoff
//!
//! ## Modules
//!
//! - [`connectivity`] - `ConnectivityMonitor` and the periodic `ConnectivityProbe`
//! - [`engine`] - `SyncEngine`, the owner of the in-memory offline state
//! - [`scheduler`] - `AutoSyncScheduler`
//! - [`notifier`] - `TracingNotifier`, a log-only `INotificationService`

pub mod connectivity;
pub mod engine;
pub mod notifier;
pub mod scheduler;

use thiserror::Error;

pub use connectivity::{ConnectivityEvent, ConnectivityMonitor, ConnectivityProbe, TransitionCause};
pub use engine::{EngineOptions, SyncEngine, SyncReport};
pub use notifier::TracingNotifier;
pub use scheduler::AutoSyncScheduler;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The effective connectivity state is offline
    #[error("Cannot sync while offline")]
    Offline,

    /// Another sync pass is running
    #[error("A sync is already in progress")]
    AlreadyInProgress,

    /// Shutdown was requested before the pass started
    #[error("Sync cancelled")]
    Cancelled,

    /// Persisting or loading the offline state failed
    #[error("Cache error: {0}")]
    Cache(#[from] lexsync_cache::CacheError),

    /// A domain-level error propagated from lexsync-core
    #[error("Domain error: {0}")]
    DomainError(#[from] lexsync_core::domain::errors::DomainError),
}
