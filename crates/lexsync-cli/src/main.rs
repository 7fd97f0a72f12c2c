//! LexSync CLI - Command-line interface for LexSync
//!
//! Provides commands for:
//! - Viewing offline sync status
//! - Managing cached case records and recording changes
//! - Running a manual sync and retrying dead letters
//! - Toggling offline mode
//! - Managing cache settings and clearing the cache

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    cache::CacheCommand, change::ChangeCommand, offline::OfflineCommand,
    records::RecordsCommand, retry::RetryCommand, settings::SettingsCommand,
    status::StatusCommand, sync::SyncCommand,
};
use context::AppContext;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "lexsync",
    version,
    about = "Offline case records and change sync for LexSync"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show connectivity, queue, and cache status
    Status(StatusCommand),
    /// Manage cached case records
    #[command(subcommand)]
    Records(RecordsCommand),
    /// Record a change against a cached record
    Change(ChangeCommand),
    /// Push pending changes to the remote now
    Sync(SyncCommand),
    /// Turn offline mode on or off
    Offline(OfflineCommand),
    /// View and change cache settings
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Clear or clean up the offline cache
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Re-queue changes that exhausted their retries
    Retry(RetryCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let ctx = match AppContext::load(format, cli.config.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            get_formatter(format).error(&format!("{:#}", e));
            std::process::exit(2);
        }
    };

    match cli.command {
        Commands::Status(cmd) => cmd.execute(&ctx).await,
        Commands::Records(cmd) => cmd.execute(&ctx).await,
        Commands::Change(cmd) => cmd.execute(&ctx).await,
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Offline(cmd) => cmd.execute(&ctx).await,
        Commands::Settings(cmd) => cmd.execute(&ctx).await,
        Commands::Cache(cmd) => cmd.execute(&ctx).await,
        Commands::Retry(cmd) => cmd.execute(&ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_change_command() {
        let cli = Cli::try_parse_from([
            "lexsync",
            "--json",
            "change",
            "550e8400-e29b-41d4-a716-446655440000",
            "--kind",
            "case-note",
            "--payload",
            r#"{"note":"hearing moved"}"#,
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Change(cmd) => {
                assert_eq!(cmd.kind, lexsync_core::domain::ChangeKind::CaseNote);
                assert_eq!(cmd.payload, r#"{"note":"hearing moved"}"#);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_change_kind() {
        let result = Cli::try_parse_from([
            "lexsync",
            "change",
            "550e8400-e29b-41d4-a716-446655440000",
            "--kind",
            "rename",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_offline_toggle_and_global_flags() {
        let cli = Cli::try_parse_from(["lexsync", "offline", "on", "-vv", "--config", "/tmp/c.yaml"])
            .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
        match cli.command {
            Commands::Offline(cmd) => assert_eq!(cmd.mode, commands::offline::Toggle::On),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_cache_clear_yes() {
        let cli = Cli::try_parse_from(["lexsync", "cache", "clear", "--yes"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cache(CacheCommand::Clear { yes: true })
        ));
    }

    #[test]
    fn test_parse_settings_set() {
        let cli = Cli::try_parse_from([
            "lexsync",
            "settings",
            "set",
            "--max-size-mb",
            "250",
            "--auto-cleanup",
            "false",
        ])
        .unwrap();
        match cli.command {
            Commands::Settings(SettingsCommand::Set {
                max_size_mb,
                retention_days,
                auto_cleanup,
            }) => {
                assert_eq!(max_size_mb, Some(250));
                assert_eq!(retention_days, None);
                assert_eq!(auto_cleanup, Some(false));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
