//! Change command - Record a local edit against a cached record
//!
//! The change is applied to the cached record and queued for the next sync.

use anyhow::{Context, Result};
use clap::Args;

use lexsync_core::domain::{ChangeKind, RecordId};

use crate::context::AppContext;
use crate::output::get_formatter;

#[derive(Debug, Args)]
pub struct ChangeCommand {
    /// ID of the cached record the change applies to
    pub record: RecordId,

    /// Kind of change: case_update, document_upload, or case_note
    #[arg(long, default_value = "case_update")]
    pub kind: ChangeKind,

    /// Change payload as a JSON object
    #[arg(long, default_value = "{}")]
    pub payload: String,
}

impl ChangeCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);

        let payload: serde_json::Value = match serde_json::from_str(&self.payload) {
            Ok(value @ serde_json::Value::Object(_)) => value,
            Ok(_) => {
                formatter.error("Payload must be a JSON object");
                return Ok(());
            }
            Err(e) => {
                formatter.error(&format!("Invalid payload JSON: {}", e));
                return Ok(());
            }
        };

        let engine = ctx.open_engine(false).await?;
        let id = engine
            .record_change(self.kind, self.record, payload)
            .await
            .context("Failed to record change")?;
        let pending = engine.pending_count();

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "change_id": id,
                "pending_changes": pending,
            }));
        } else {
            formatter.success(&format!("Queued {} change {}", self.kind, id));
            formatter.info(&format!("{} change(s) pending", pending));
        }
        Ok(())
    }
}
