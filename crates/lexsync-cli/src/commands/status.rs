//! Status command - Display offline sync status
//!
//! Provides the `lexsync status` CLI command which:
//! 1. Probes the remote once and shows the effective connectivity
//! 2. Shows the pending queue, dead letters, and last sync time
//! 3. Counts cached records by sync status
//! 4. Shows the cache policy and current cache size

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use tracing::info;

use lexsync_core::domain::{OfflineState, RecordSyncStatus};

use crate::context::AppContext;
use crate::output::{format_bytes, format_time, get_formatter};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// List every pending change
    #[arg(long)]
    pub verbose_queue: bool,
}

impl StatusCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let engine = ctx.open_engine(true).await?;
        let state = engine.state().await;
        let policy = engine.settings().load().await;
        let flags = engine.connectivity().flags();

        let counts = count_by_status(&state);
        let size = state.serialized_size();

        info!(pending = state.pending().len(), "Showing status");

        if ctx.format.is_json() {
            let json = serde_json::json!({
                "connectivity": engine.connectivity().state().to_string(),
                "network_online": flags.network_online,
                "offline_mode": state.offline_mode(),
                "last_sync": state.last_sync().map(|t| t.to_rfc3339()),
                "pending_changes": state.pending().len(),
                "dead_letters": state.dead_letters().len(),
                "records": counts,
                "cache": {
                    "size_bytes": size,
                    "policy": policy,
                },
            });
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!(
            "LexSync Status - {}",
            engine.connectivity().state()
        ));
        formatter.info("");
        formatter.info(&format!(
            "Network:        {}",
            if flags.network_online { "reachable" } else { "unreachable" }
        ));
        formatter.info(&format!(
            "Offline mode:   {}",
            if state.offline_mode() { "on" } else { "off" }
        ));
        formatter.info(&format!("Last sync:      {}", format_time(state.last_sync())));
        formatter.info(&format!("Pending:        {}", state.pending().len()));
        formatter.info(&format!("Dead letters:   {}", state.dead_letters().len()));
        formatter.info("");

        formatter.info("Records:");
        for status in [
            RecordSyncStatus::Synced,
            RecordSyncStatus::Pending,
            RecordSyncStatus::Error,
        ] {
            let count = counts.get(status.name()).copied().unwrap_or(0);
            formatter.info(&format!("  {:<10} {}", status.name(), count));
        }
        formatter.info("");

        formatter.info(&format!(
            "Cache:          {} of {} MB, {} day retention, auto-cleanup {}",
            format_bytes(size),
            policy.max_size_mb(),
            policy.retention_days,
            if policy.auto_cleanup { "on" } else { "off" }
        ));

        if self.verbose_queue && !state.pending().is_empty() {
            formatter.info("");
            formatter.info("Pending changes:");
            for change in state.pending().iter() {
                let error = change
                    .last_error()
                    .map(|e| format!(" (last error: {})", e))
                    .unwrap_or_default();
                formatter.info(&format!(
                    "  {} {} {} retries={}{}",
                    change.id(),
                    change.kind(),
                    change.record_id(),
                    change.retry_count(),
                    error
                ));
            }
        }

        if !state.dead_letters().is_empty() {
            formatter.info("");
            formatter.warn(&format!(
                "{} change(s) gave up after repeated failures. Run 'lexsync retry' to queue them again.",
                state.dead_letters().len()
            ));
        }

        Ok(())
    }
}

fn count_by_status(state: &OfflineState) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for record in state.records() {
        *counts.entry(record.sync_status().name()).or_insert(0) += 1;
    }
    counts
}
