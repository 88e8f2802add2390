//! Sync CLI commands for pushing queued changes to the server.

use clap::{Args, Subcommand};
use rescue_core::{spawn_auto_drain, StoreError, SyncEngine};
use std::sync::Arc;
use std::time::Duration;

use crate::app::App;
use crate::config::Config;
use crate::sync::spawn_presence_monitor;

/// How often `sync watch` re-checks the server.
const PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Sync with remote server
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration, server status and pending items
    Status,

    /// Stay running and sync whenever the server becomes reachable
    Watch,
}

impl SyncCommand {
    pub fn is_watch(&self) -> bool {
        matches!(self.command, Some(SyncSubcommand::Watch))
    }

    pub async fn run(&self, app: &App, config: &Config) -> Result<(), SyncCommandError> {
        match &self.command {
            None => self.sync(app, config).await,
            Some(SyncSubcommand::Status) => self.status(app, config).await,
            Some(SyncSubcommand::Watch) => self.watch(app, config).await,
        }
    }

    async fn sync(&self, app: &App, config: &Config) -> Result<(), SyncCommandError> {
        let engine = require_engine(app)?;

        println!("Syncing with server...");
        if !app.detect_connectivity(config).await {
            let pending = engine.pending().await?;
            println!("✗ server unreachable, {} item(s) pending", pending);
            return Ok(());
        }

        let outcome = engine.drain().await;
        if outcome.is_failure() {
            println!("✗ {}", outcome);
        } else {
            println!("✓ {}", outcome);
        }
        Ok(())
    }

    async fn status(&self, app: &App, config: &Config) -> Result<(), SyncCommandError> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        let Some(server_url) = config.sync.server_url.as_ref() else {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!();
            println!("Or set environment variable:");
            println!("  RESCUE_SYNC_URL");
            return Ok(());
        };
        let engine = require_engine(app)?;

        println!("Server:       {}", server_url);
        println!(
            "Auto-sync:    {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("On rejection: {}", config.sync.on_rejection);
        println!();

        let reachable = app.detect_connectivity(config).await;
        println!(
            "Server status: {}",
            if reachable {
                "✓ reachable"
            } else {
                "✗ unreachable"
            }
        );
        println!("Pending:       {}", engine.pending().await?);
        match engine.last_drain_at().await? {
            Some(at) => println!("Last sync:     {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("Last sync:     never"),
        }

        let dead = app.outbox.dead_letters().await?;
        if !dead.is_empty() {
            println!();
            println!("Rejected items ({}):", dead.len());
            for letter in &dead {
                println!(
                    "  {} {} -> {}",
                    letter.item.action.tag(),
                    letter.item.action.target_id(),
                    letter.reason
                );
            }
        }

        Ok(())
    }

    async fn watch(&self, app: &App, config: &Config) -> Result<(), SyncCommandError> {
        let engine = require_engine(app)?;
        let server_url = config
            .sync
            .server_url
            .clone()
            .ok_or(SyncCommandError::NotConfigured)?;

        println!(
            "Watching {} ({} item(s) pending). Press Ctrl-C to stop.",
            server_url,
            engine.pending().await?
        );

        let monitor = spawn_presence_monitor(app.gate.clone(), server_url, PROBE_INTERVAL);
        let drainer = spawn_auto_drain(engine, config.sync.interval());

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| SyncCommandError::RuntimeError(e.to_string()))?;

        monitor.abort();
        drainer.abort();
        println!("Stopped.");
        Ok(())
    }
}

fn require_engine(app: &App) -> Result<Arc<SyncEngine>, SyncCommandError> {
    app.engine.clone().ok_or(SyncCommandError::NotConfigured)
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    NotConfigured,
    StorageError(StoreError),
    RuntimeError(String),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::NotConfigured => write!(
                f,
                "Sync is not configured. Set sync.server_url or RESCUE_SYNC_URL."
            ),
            SyncCommandError::StorageError(e) => write!(f, "{}", e),
            SyncCommandError::RuntimeError(e) => write!(f, "Runtime error: {}", e),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::StorageError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for SyncCommandError {
    fn from(e: StoreError) -> Self {
        SyncCommandError::StorageError(e)
    }
}
