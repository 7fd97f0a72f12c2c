//! Records command - Manage cached case records
//!
//! `lexsync records list` shows what is held offline; `lexsync records add`
//! seeds a case record into the cache so changes can be recorded against it.

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use lexsync_core::domain::{CachedRecord, CaseDetails, CaseNumber};

use crate::context::AppContext;
use crate::output::{format_time, get_formatter};

#[derive(Debug, Subcommand)]
pub enum RecordsCommand {
    /// List cached case records
    List,
    /// Add a case record to the offline cache
    Add {
        /// Court case number, e.g. "CIV/2024/0113"
        #[arg(long)]
        case_number: String,
        /// Case title
        #[arg(long)]
        title: String,
        /// Case status
        #[arg(long, default_value = "active")]
        status: String,
    },
}

impl RecordsCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            RecordsCommand::List => self.execute_list(ctx).await,
            RecordsCommand::Add {
                case_number,
                title,
                status,
            } => self.execute_add(ctx, case_number, title, status).await,
        }
    }

    async fn execute_list(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let engine = ctx.open_engine(false).await?;
        let state = engine.state().await;

        if ctx.format.is_json() {
            let json = serde_json::to_value(state.records())
                .context("Failed to serialize records")?;
            formatter.print_json(&json);
            return Ok(());
        }

        if state.records().is_empty() {
            formatter.info("No cached records");
            return Ok(());
        }

        formatter.success(&format!("{} cached record(s)", state.records().len()));
        formatter.info("");
        formatter.info(&format!(
            "{:<36}  {:<18}  {:<8}  {:<20}  {}",
            "ID", "CASE NUMBER", "SYNC", "MODIFIED", "TITLE"
        ));
        for record in state.records() {
            let details = record.details();
            formatter.info(&format!(
                "{:<36}  {:<18}  {:<8}  {:<20}  {}",
                record.id(),
                details.case_number.as_str(),
                record.sync_status().name(),
                format_time(Some(record.last_modified())),
                details.title
            ));
            if let Some(error) = record.last_error() {
                formatter.info(&format!("    last error: {}", error));
            }
        }
        Ok(())
    }

    async fn execute_add(
        &self,
        ctx: &AppContext,
        case_number: &str,
        title: &str,
        status: &str,
    ) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let case_number = match CaseNumber::new(case_number) {
            Ok(n) => n,
            Err(e) => {
                formatter.error(&e.to_string());
                return Ok(());
            }
        };

        let engine = ctx.open_engine(false).await?;
        let record = CachedRecord::new(CaseDetails::new(case_number, title, status));
        let id = *record.id();
        engine.upsert_record(record).await?;

        info!(record_id = %id, "Record added");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({"success": true, "id": id}));
        } else {
            formatter.success(&format!("Added record {}", id));
        }
        Ok(())
    }
}
