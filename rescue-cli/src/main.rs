use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod commands;
mod config;
mod sync;

use app::App;
use commands::{ConfigCommand, RequestCommand, SyncCommand, TaskCommand};
use config::Config;
use sync::try_auto_sync;

#[derive(Parser)]
#[command(name = "rescue")]
#[command(version)]
#[command(about = "Offline-first disaster rescue requests", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Raise and track rescue requests
    Request(RequestCommand),

    /// Assign volunteers and list their tasks
    Task(TaskCommand),

    /// Manage configuration
    Config(ConfigCommand),

    /// Sync with remote server
    Sync(SyncCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Watch mode narrates sync passes through the log
    let default_filter = match &cli.command {
        Some(Commands::Sync(cmd)) if cmd.is_watch() => "rescue_core=info",
        _ => "warn",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Request(cmd)) => {
            let app = App::open(&config).await?;
            let write = cmd.is_write();
            if write {
                // Classification and auto-sync both depend on being online
                app.detect_connectivity(&config).await;
            }
            cmd.run(&app).await?;
            if write {
                try_auto_sync(&app, &config).await;
            }
        }
        Some(Commands::Task(cmd)) => {
            let app = App::open(&config).await?;
            let write = cmd.is_write();
            cmd.run(&app).await?;
            if write {
                app.detect_connectivity(&config).await;
                try_auto_sync(&app, &config).await;
            }
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        Some(Commands::Sync(cmd)) => {
            let app = App::open(&config).await?;
            cmd.run(&app, &config).await?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
