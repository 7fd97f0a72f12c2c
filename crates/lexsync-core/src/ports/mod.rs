//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the traits the sync core depends on. Their implementations
//! live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteEndpoint`] - The case-management API that accepts changes
//! - [`IKeyValueStore`] - Durable key-value storage backing the offline cache
//! - [`INotificationService`] - User-facing notifications

pub mod key_value;
pub mod notification;
pub mod remote;

pub use key_value::{IKeyValueStore, Versioned};
pub use notification::{INotificationService, Notification, NotificationPriority};
pub use remote::{IRemoteEndpoint, PushReceipt, RemoteRejection};
