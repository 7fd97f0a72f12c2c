//! Process-wide status types
//!
//! [`SyncStatus`] is the transient state of the sync engine, [`SyncTrigger`]
//! says who started a pass, and [`ConnectivityState`] is the effective
//! online/offline state consulted before draining the queue.

use serde::{Deserialize, Serialize};

/// Transient status of the sync engine
///
/// Moves `Idle → Syncing → {Success, Error} → Idle`; the final step happens
/// after a short display timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No sync running
    Idle,
    /// A sync pass is in flight
    Syncing,
    /// The last pass finished without failures
    Success,
    /// The last pass finished with failures
    Error(String),
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }

    /// Returns true for the terminal states that reset to idle
    pub fn is_settled(&self) -> bool {
        matches!(self, SyncStatus::Success | SyncStatus::Error(_))
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Idle
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "idle"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Who started a sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// User pressed "sync now"
    Manual,
    /// The auto-sync scheduler fired
    Auto,
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncTrigger::Manual => write!(f, "manual"),
            SyncTrigger::Auto => write!(f, "auto"),
        }
    }
}

/// Online/offline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectivityState::Online)
    }

    pub fn from_online(online: bool) -> Self {
        if online {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        }
    }
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectivityState::Online => write!(f, "online"),
            ConnectivityState::Offline => write!(f, "offline"),
        }
    }
}
