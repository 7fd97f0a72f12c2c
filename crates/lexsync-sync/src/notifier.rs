//! Log-only notification service
//!
//! Used by the daemon when no desktop notification channel is available.
//! Each notification becomes one structured log event at a level matching
//! its priority.

use lexsync_core::ports::{INotificationService, Notification, NotificationPriority};
use tracing::{info, warn};

/// Writes notifications to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl INotificationService for TracingNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        match notification.priority {
            NotificationPriority::High => warn!(
                category = %notification.category,
                title = %notification.title,
                "{}",
                notification.body
            ),
            NotificationPriority::Normal | NotificationPriority::Low => info!(
                category = %notification.category,
                title = %notification.title,
                "{}",
                notification.body
            ),
        }
        Ok(())
    }
}
