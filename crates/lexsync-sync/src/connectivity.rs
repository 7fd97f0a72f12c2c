//! Connectivity tracking
//!
//! The effective state is online only when the network is reachable and the
//! user has not switched on offline mode. [`ConnectivityMonitor`] publishes
//! the current flags on a watch channel and every change of the effective
//! state as a [`ConnectivityEvent`] on a broadcast channel.
//!
//! Losing the network forces offline mode on. When the network comes back,
//! offline mode is released again unless the user had switched it on
//! themselves.
//!
//! [`ConnectivityProbe`] feeds the monitor by polling the remote's health
//! endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use lexsync_core::domain::ConnectivityState;
use lexsync_core::ports::IRemoteEndpoint;

/// Capacity of the transition event channel
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// What caused a change of the effective state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// The network went up or down
    Network,
    /// The user toggled offline mode
    User,
}

/// A change of the effective connectivity state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityEvent {
    pub state: ConnectivityState,
    pub cause: TransitionCause,
}

/// Raw inputs to the effective state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectivityFlags {
    pub network_online: bool,
    pub offline_mode: bool,
    /// Offline mode was switched on by a network loss, not by the user
    pub forced_by_network: bool,
}

impl ConnectivityFlags {
    pub fn effective(&self) -> ConnectivityState {
        ConnectivityState::from_online(self.network_online && !self.offline_mode)
    }
}

/// Tracks network reachability and the offline-mode flag
pub struct ConnectivityMonitor {
    flags_tx: watch::Sender<ConnectivityFlags>,
    events_tx: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial network state and offline mode off
    pub fn new(network: ConnectivityState) -> Self {
        let (flags_tx, _) = watch::channel(ConnectivityFlags {
            network_online: network.is_online(),
            offline_mode: false,
            forced_by_network: false,
        });
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            flags_tx,
            events_tx,
        }
    }

    pub fn flags(&self) -> ConnectivityFlags {
        *self.flags_tx.borrow()
    }

    /// The effective state consulted before syncing
    pub fn state(&self) -> ConnectivityState {
        self.flags().effective()
    }

    pub fn is_online(&self) -> bool {
        self.state().is_online()
    }

    pub fn offline_mode(&self) -> bool {
        self.flags().offline_mode
    }

    /// Receiver of transition events
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events_tx.subscribe()
    }

    /// Receiver that always holds the current flags
    pub fn watch(&self) -> watch::Receiver<ConnectivityFlags> {
        self.flags_tx.subscribe()
    }

    /// Records the network state reported by the platform or the probe
    pub fn set_network(&self, network: ConnectivityState) {
        self.update(TransitionCause::Network, |flags| {
            let online = network.is_online();
            if flags.network_online == online {
                return false;
            }
            flags.network_online = online;
            if !online && !flags.offline_mode {
                flags.offline_mode = true;
                flags.forced_by_network = true;
            } else if online && flags.forced_by_network {
                flags.offline_mode = false;
                flags.forced_by_network = false;
            }
            true
        });
    }

    /// Applies the user's offline-mode toggle
    pub fn set_offline_mode(&self, enabled: bool) {
        self.update(TransitionCause::User, |flags| {
            if flags.offline_mode == enabled && !flags.forced_by_network {
                return false;
            }
            flags.offline_mode = enabled;
            flags.forced_by_network = false;
            true
        });
    }

    fn update<F>(&self, cause: TransitionCause, modify: F)
    where
        F: FnOnce(&mut ConnectivityFlags) -> bool,
    {
        let mut before = None;
        let mut after = None;
        self.flags_tx.send_if_modified(|flags| {
            let previous = flags.effective();
            let changed = modify(flags);
            if changed {
                before = Some(previous);
                after = Some(flags.effective());
            }
            changed
        });

        if let (Some(before), Some(after)) = (before, after) {
            debug!(flags = ?self.flags(), ?cause, "Connectivity flags updated");
            if before != after {
                info!(state = %after, ?cause, "Connectivity changed");
                // No receivers is fine
                let _ = self.events_tx.send(ConnectivityEvent {
                    state: after,
                    cause,
                });
            }
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(ConnectivityState::Online)
    }
}

/// Periodically checks the remote's health endpoint
pub struct ConnectivityProbe {
    remote: Arc<dyn IRemoteEndpoint>,
    monitor: Arc<ConnectivityMonitor>,
    interval: Duration,
}

impl ConnectivityProbe {
    pub fn new(
        remote: Arc<dyn IRemoteEndpoint>,
        monitor: Arc<ConnectivityMonitor>,
        interval: Duration,
    ) -> Self {
        Self {
            remote,
            monitor,
            interval,
        }
    }

    /// Probes once, feeds the result into the monitor, and returns it
    pub async fn check_once(&self) -> ConnectivityState {
        let state = match self.remote.probe().await {
            Ok(()) => ConnectivityState::Online,
            Err(e) => {
                debug!(error = %e, "Remote probe failed");
                ConnectivityState::Offline
            }
        };
        self.monitor.set_network(state);
        state
    }

    /// Probes every interval until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Connectivity probe starting");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.check_once().await;
                }
            }
        }

        info!("Connectivity probe stopped");
    }
}
