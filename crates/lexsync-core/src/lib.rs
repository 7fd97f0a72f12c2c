//! LexSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `CachedRecord`, `PendingChange`, `OfflineState`, `CachePolicy`
//! - **Queue** - `PendingChangeQueue` with retry counters and dead-lettering
//! - **Port definitions** - Traits for adapters: `IRemoteEndpoint`, `IKeyValueStore`,
//!   `INotificationService`
//! - **Configuration** - YAML-backed `Config` with defaults and validation
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`lexsync-cache`, `lexsync-remote`, `lexsync-sync`).

pub mod config;
pub mod domain;
pub mod ports;
