//! Auto-sync scheduler
//!
//! The [`AutoSyncScheduler`] watches the engine's queue length and the
//! connectivity events, and runs an automatic sync pass once the app is
//! online with a non-empty queue and nothing has changed for the configured
//! delay. With a refresh interval set, it also reloads the stored state
//! periodically so changes queued by other processes are picked up.
//!
//! ## Flow
//!
//! ```text
//! store refresh (interval) ──→ queue length (watch) ──┐
//!                                                     ├──→ re-arm deadline ──→ perform_sync(auto)
//! connectivity events ────────────────────────────────┘
//! ```
//!
//! Every relevant change re-arms the deadline, so a burst of edits produces
//! one pass. After a pass with failures the delay doubles, up to 32 times the
//! base delay, and resets after the next clean pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lexsync_core::config::SyncConfig;
use lexsync_core::domain::{ConnectivityState, SyncTrigger};
use lexsync_core::ports::Notification;

use crate::connectivity::{ConnectivityEvent, TransitionCause};
use crate::engine::SyncEngine;
use crate::SyncError;

/// Largest backoff exponent; 2^5 = 32x the base delay
const MAX_BACKOFF_EXPONENT: u32 = 5;

/// Delay multiplier after `failures` consecutive failed passes
fn backoff_multiplier(failures: u32) -> u32 {
    1 << failures.min(MAX_BACKOFF_EXPONENT)
}

/// Debounced trigger for automatic sync passes
pub struct AutoSyncScheduler {
    engine: Arc<SyncEngine>,
    enabled: bool,
    delay: Duration,
    refresh_interval: Option<Duration>,
    failures: u32,
}

impl AutoSyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, enabled: bool, delay: Duration) -> Self {
        info!(
            enabled,
            delay_ms = delay.as_millis() as u64,
            "Creating auto-sync scheduler"
        );
        Self {
            engine,
            enabled,
            delay,
            refresh_interval: None,
            failures: 0,
        }
    }

    pub fn from_config(engine: Arc<SyncEngine>, config: &SyncConfig) -> Self {
        Self::new(
            engine,
            config.auto_sync,
            Duration::from_millis(config.auto_sync_delay_ms),
        )
        .with_refresh_interval(Duration::from_secs(config.probe_interval_secs))
    }

    /// Reloads the stored state every `interval`
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Delay before the next automatic pass, including backoff
    pub fn current_delay(&self) -> Duration {
        self.delay * backoff_multiplier(self.failures)
    }

    /// Main loop; returns when `shutdown` is cancelled
    ///
    /// Runs four branches via `tokio::select!`:
    ///
    /// 1. **Queue changes**: re-arm the deadline.
    /// 2. **Connectivity events**: announce network transitions, re-arm.
    /// 3. **Deadline**: run `perform_sync(auto)`, update the backoff, re-arm.
    /// 4. **Refresh tick**: reload the stored state; a changed queue length
    ///    arrives through branch 1.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Auto-sync scheduler starting");

        let mut refresh = self.refresh_interval.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut pending_rx = self.engine.subscribe_pending();
        let mut events = self.engine.connectivity().subscribe();
        let mut queued = *pending_rx.borrow_and_update();
        let mut deadline = self.arm(queued);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,

                changed = pending_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    queued = *pending_rx.borrow_and_update();
                    deadline = self.arm(queued);
                }

                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            self.announce(event).await;
                            if event.state.is_online() {
                                self.failures = 0;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Missed connectivity events");
                        }
                        Err(RecvError::Closed) => break,
                    }
                    deadline = self.arm(queued);
                }

                _ = sleep_until(deadline) => {
                    self.run_pass().await;
                    queued = *pending_rx.borrow_and_update();
                    deadline = self.arm(queued);
                }

                _ = tick(&mut refresh) => {
                    if let Err(e) = self.engine.refresh().await {
                        warn!(error = %e, "Failed to refresh offline state");
                    }
                }
            }
        }

        info!("Auto-sync scheduler stopped");
    }

    /// Deadline for the next pass, or `None` if no pass is due
    fn arm(&self, queued: usize) -> Option<Instant> {
        if !self.enabled || queued == 0 || !self.engine.connectivity().is_online() {
            return None;
        }
        let delay = self.current_delay();
        debug!(queued, delay_ms = delay.as_millis() as u64, "Auto-sync armed");
        Some(Instant::now() + delay)
    }

    async fn run_pass(&mut self) {
        match self.engine.perform_sync(SyncTrigger::Auto).await {
            Ok(report) if report.failed == 0 => {
                self.failures = 0;
            }
            Ok(report) => {
                self.failures = self.failures.saturating_add(1);
                info!(
                    failed = report.failed,
                    next_delay_ms = self.current_delay().as_millis() as u64,
                    "Auto-sync pass had failures, backing off"
                );
            }
            Err(SyncError::AlreadyInProgress) | Err(SyncError::Offline) => {
                debug!("Auto-sync skipped");
            }
            Err(SyncError::Cancelled) => {}
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                warn!(error = %e, "Auto-sync pass failed");
            }
        }
    }

    /// Tells the user about network transitions; user toggles stay silent
    async fn announce(&self, event: ConnectivityEvent) {
        if event.cause != TransitionCause::Network {
            return;
        }
        let notification = match event.state {
            ConnectivityState::Offline => Notification::connectivity(
                "You are offline",
                "Changes are saved locally and will sync when the connection returns",
            ),
            ConnectivityState::Online => {
                let queued = self.engine.pending_count();
                let body = if queued == 0 {
                    "Connection restored".to_string()
                } else {
                    format!("Connection restored; {} queued for sync", queued)
                };
                Notification::connectivity("Back online", body)
            }
        };
        self.engine.notify(notification).await;
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
