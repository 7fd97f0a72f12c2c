//! Offline command - Toggle user-controlled offline mode
//!
//! While offline mode is on, edits are only recorded locally and no sync
//! runs, even when the network is available.

use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing::info;

use crate::context::AppContext;
use crate::output::get_formatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Args)]
pub struct OfflineCommand {
    /// Turn offline mode on or off
    #[arg(value_enum)]
    pub mode: Toggle,
}

impl OfflineCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let enabled = self.mode == Toggle::On;

        let engine = ctx.open_engine(false).await?;
        engine.set_offline_mode(enabled).await?;
        let pending = engine.pending_count();

        info!(enabled, "Offline mode updated");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "offline_mode": enabled,
                "pending_changes": pending,
            }));
        } else if enabled {
            formatter.success("Offline mode on");
            formatter.info("Changes are saved locally until offline mode is turned off");
        } else {
            formatter.success("Offline mode off");
            if pending > 0 {
                formatter.info(&format!(
                    "{} change(s) pending; run 'lexsync sync' or let the daemon sync them",
                    pending
                ));
            }
        }
        Ok(())
    }
}
