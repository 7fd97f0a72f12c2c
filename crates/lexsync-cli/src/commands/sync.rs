//! Sync command - Push queued changes to the remote
//!
//! Provides the `lexsync sync` CLI command which:
//! 1. Loads configuration and opens the offline cache
//! 2. Probes the remote so the engine sees the real network state
//! 3. Runs one manual sync pass and displays the report

use anyhow::Result;
use clap::Args;
use tracing::info;

use lexsync_core::domain::SyncTrigger;
use lexsync_sync::SyncError;

use crate::context::AppContext;
use crate::output::get_formatter;

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Show the queue without pushing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let engine = ctx.open_engine(!self.dry_run).await?;

        if self.dry_run {
            let state = engine.state().await;
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "dry_run": true,
                    "pending_changes": state.pending().iter().collect::<Vec<_>>(),
                }));
            } else {
                formatter.success(&format!(
                    "{} change(s) would be pushed",
                    state.pending().len()
                ));
                for change in state.pending().iter() {
                    formatter.info(&format!(
                        "{} {} for {}",
                        change.id(),
                        change.kind(),
                        change.record_id()
                    ));
                }
            }
            return Ok(());
        }

        info!("Starting manual sync");

        let report = match engine.perform_sync(SyncTrigger::Manual).await {
            Ok(report) => report,
            // Already reported through the notifier
            Err(SyncError::Offline) => return Ok(()),
            Err(e) => {
                formatter.error(&format!("Sync failed: {}", e));
                return Ok(());
            }
        };

        if ctx.format.is_json() {
            let json = serde_json::to_value(&report)?;
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.info(&format!(
            "Attempted {}, synced {}, failed {}, remaining {} ({} ms)",
            report.attempted, report.synced, report.failed, report.remaining, report.duration_ms
        ));
        if report.dead_lettered > 0 {
            formatter.info(&format!("Moved to dead letters: {}", report.dead_lettered));
        }
        for error in &report.errors {
            formatter.info(&format!("  {}", error));
        }
        if let Some(cleanup) = report.cleanup.filter(|c| c.removed_anything()) {
            formatter.info(&format!(
                "Cleanup: {} expired, {} evicted for size",
                cleanup.expired_records, cleanup.evicted_for_size
            ));
        }
        Ok(())
    }
}
