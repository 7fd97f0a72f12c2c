//! Notification service port (driven/secondary port)
//!
//! Sync outcomes and connectivity transitions are reported to the user
//! through this port. Implementations may print to a terminal, write to the
//! log, or forward to a desktop notification daemon.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because notification delivery is adapter-specific.
//! - Notifications are fire-and-forget; callers log and ignore failures.

use serde::{Deserialize, Serialize};

/// Priority level for a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Informational, safe to drop
    Low,
    Normal,
    /// Something the user should act on
    High,
}

impl Default for NotificationPriority {
    fn default() -> Self {
        NotificationPriority::Normal
    }
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// A message to show to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Short headline, e.g. "Sync complete"
    pub title: String,
    /// Detail line, e.g. "2 changes synced"
    pub body: String,
    pub priority: NotificationPriority,
    /// Grouping key: "sync", "connectivity" or "error"
    pub category: String,
}

impl Notification {
    /// Creates a notification with `Normal` priority and no category
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            priority: NotificationPriority::Normal,
            category: String::new(),
        }
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Creates a sync-related notification
    pub fn sync(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body).with_category("sync")
    }

    /// Creates a connectivity transition notification with Low priority
    pub fn connectivity(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body)
            .with_priority(NotificationPriority::Low)
            .with_category("connectivity")
    }

    /// Creates an error notification with High priority
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body)
            .with_priority(NotificationPriority::High)
            .with_category("error")
    }

    pub fn is_error(&self) -> bool {
        self.category == "error"
    }
}

/// Port trait for user-facing notifications
#[async_trait::async_trait]
pub trait INotificationService: Send + Sync {
    /// Delivers a notification
    ///
    /// Implementations should not fail when no display is available; they
    /// should degrade to logging instead.
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}
