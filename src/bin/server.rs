//! RescueSync Reference Server
//!
//! Accepts sync items from `rescue` clients and keeps the authoritative copy
//! of every request and volunteer task.
//!
//! # Configuration
//!
//! Environment variables:
//! - `RESCUESYNC_PORT`: Port to listen on (default: 8080)
//! - `RESCUESYNC_DATA_DIR`: Directory for `authority.db` (default: ~/.local/share/rescuesync-server)
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint
//! - `POST /sync/items`: Submit one sync item
//! - `GET /requests`: All accepted requests
//! - `GET /requests/{id}`: One request with its volunteer tasks

use rescuesync::server::{router, AppState, AuthorityStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    port: u16,
    data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("RESCUESYNC_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("RESCUESYNC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("rescuesync-server")
            });

        Self { port, data_dir }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rescuesync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        tracing::error!("Failed to create data directory: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Data directory: {}", config.data_dir.display());

    let store = match AuthorityStore::open(&config.data_dir).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open authority database: {}", e);
            std::process::exit(1);
        }
    };

    let app = router(AppState { store });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
