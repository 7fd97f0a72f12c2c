//! Settings command - View and change the cache policy
//!
//! Provides the `lexsync settings` CLI command which:
//! 1. Shows the saved cache policy along with the offered choices
//! 2. Updates the size limit, retention, or auto-cleanup flag

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use lexsync_core::domain::policy::{RETENTION_OPTIONS_DAYS, SIZE_OPTIONS_MB};
use lexsync_core::domain::CachePolicy;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Display the current cache policy
    Show,
    /// Change one or more cache policy values
    Set {
        /// Maximum cache size in megabytes
        #[arg(long)]
        max_size_mb: Option<u64>,
        /// Days to keep synced records
        #[arg(long)]
        retention_days: Option<u32>,
        /// Run eviction after each sync
        #[arg(long)]
        auto_cleanup: Option<bool>,
    },
}

impl SettingsCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            SettingsCommand::Show => self.execute_show(ctx).await,
            SettingsCommand::Set {
                max_size_mb,
                retention_days,
                auto_cleanup,
            } => {
                self.execute_set(ctx, *max_size_mb, *retention_days, *auto_cleanup)
                    .await
            }
        }
    }

    async fn execute_show(&self, ctx: &AppContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let engine = ctx.open_engine(false).await?;
        let policy = engine.settings().load().await;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "policy": policy,
                "size_options_mb": SIZE_OPTIONS_MB,
                "retention_options_days": RETENTION_OPTIONS_DAYS,
            }));
            return Ok(());
        }

        formatter.success("Cache settings");
        print_policy(&*formatter, &policy);
        formatter.info("");
        formatter.info(&format!("Size choices (MB):      {}", join(SIZE_OPTIONS_MB)));
        formatter.info(&format!(
            "Retention choices (days): {}",
            join(RETENTION_OPTIONS_DAYS)
        ));
        Ok(())
    }

    async fn execute_set(
        &self,
        ctx: &AppContext,
        max_size_mb: Option<u64>,
        retention_days: Option<u32>,
        auto_cleanup: Option<bool>,
    ) -> Result<()> {
        let formatter = get_formatter(ctx.format);

        if max_size_mb.is_none() && retention_days.is_none() && auto_cleanup.is_none() {
            formatter.error("Nothing to change. Pass --max-size-mb, --retention-days, or --auto-cleanup.");
            return Ok(());
        }
        if let Some(mb) = max_size_mb.filter(|mb| !SIZE_OPTIONS_MB.contains(mb)) {
            formatter.error(&format!(
                "Unsupported cache size {} MB. Choose one of: {}",
                mb,
                join(SIZE_OPTIONS_MB)
            ));
            return Ok(());
        }
        if let Some(days) = retention_days.filter(|d| !RETENTION_OPTIONS_DAYS.contains(d)) {
            formatter.error(&format!(
                "Unsupported retention {} days. Choose one of: {}",
                days,
                join(RETENTION_OPTIONS_DAYS)
            ));
            return Ok(());
        }

        let engine = ctx.open_engine(false).await?;
        let policy = engine
            .settings()
            .update(|policy| {
                if let Some(mb) = max_size_mb {
                    *policy = CachePolicy::new(mb, policy.retention_days, policy.auto_cleanup);
                }
                if let Some(days) = retention_days {
                    policy.retention_days = days;
                }
                if let Some(enabled) = auto_cleanup {
                    policy.auto_cleanup = enabled;
                }
            })
            .await
            .context("Failed to save cache settings")?;

        info!(?policy, "Cache settings updated");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({"success": true, "policy": policy}));
        } else {
            formatter.success("Cache settings saved");
            print_policy(&*formatter, &policy);
        }
        Ok(())
    }
}

fn print_policy(formatter: &dyn OutputFormatter, policy: &CachePolicy) {
    formatter.info(&format!("Max size:     {} MB", policy.max_size_mb()));
    formatter.info(&format!("Retention:    {} days", policy.retention_days));
    formatter.info(&format!(
        "Auto-cleanup: {}",
        if policy.auto_cleanup { "on" } else { "off" }
    ));
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
