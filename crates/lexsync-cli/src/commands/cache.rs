//! Cache command - Clear or clean up the offline cache

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use lexsync_sync::SyncError;

use crate::context::AppContext;
use crate::output::{format_bytes, get_formatter};

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Remove all offline data; cache settings are kept
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Apply the cache policy now
    Cleanup,
}

impl CacheCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            CacheCommand::Clear { yes } => self.execute_clear(ctx, *yes).await,
            CacheCommand::Cleanup => self.execute_cleanup(ctx).await,
        }
    }

    async fn execute_clear(&self, ctx: &AppContext, yes: bool) -> Result<()> {
        let formatter = get_formatter(ctx.format);

        if !yes && ctx.format.is_json() {
            formatter.error("Clearing the cache in JSON mode requires --yes");
            return Ok(());
        }

        let engine = ctx.open_engine(false).await?;
        let pending = engine.pending_count();

        let confirm = || {
            yes || prompt(&format!(
                "Clear all offline data? {} unsynced change(s) will be lost. [y/N] ",
                pending
            ))
        };

        let cleared = match engine.clear_cache(confirm).await {
            Ok(cleared) => cleared,
            Err(SyncError::AlreadyInProgress) => {
                formatter.error("A sync is running; try again when it finishes");
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to clear cache"),
        };

        info!(cleared, "Cache clear finished");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": cleared,
                "discarded_changes": if cleared { pending } else { 0 },
            }));
        } else if cleared {
            formatter.success("Offline cache cleared");
        } else {
            formatter.info("Cancelled");
        }
        Ok(())
    }

    async fn execute_cleanup(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let engine = ctx.open_engine(false).await?;

        let report = engine.cleanup().await.context("Cache cleanup failed")?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
            return Ok(());
        }

        if report.removed_anything() {
            formatter.success("Cache cleaned up");
        } else {
            formatter.success("Nothing to clean up");
        }
        formatter.info(&format!("Expired records:      {}", report.expired_records));
        formatter.info(&format!("Evicted for size:     {}", report.evicted_for_size));
        formatter.info(&format!("Dropped dead letters: {}", report.dropped_dead_letters));
        formatter.info(&format!("Cache size:           {}", format_bytes(report.size_bytes)));
        Ok(())
    }
}

/// Asks a yes/no question on the terminal; anything but "y"/"yes" is no
fn prompt(question: &str) -> bool {
    print!("{}", question);
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
