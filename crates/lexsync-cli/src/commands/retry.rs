//! Retry command - Re-queue dead-lettered changes

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;
use crate::output::get_formatter;

#[derive(Debug, Args)]
pub struct RetryCommand {}

impl RetryCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let engine = ctx.open_engine(false).await?;

        let count = engine.retry_dead_letters().await?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "requeued": count,
                "pending_changes": engine.pending_count(),
            }));
        } else if count == 0 {
            formatter.info("No dead letters to retry");
        } else {
            formatter.success(&format!("Re-queued {} change(s)", count));
        }
        Ok(())
    }
}
