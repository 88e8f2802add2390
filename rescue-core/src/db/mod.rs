//! SQLite persistence: the durable record store, the outbox and sync state.

mod outbox;
mod request_repo;
mod sync_state;
mod task_repo;

pub use outbox::{DeadLetter, OutboxQueue};
pub use request_repo::RequestStore;
pub use sync_state::SyncStateRepo;
pub use task_repo::TaskStore;

pub(crate) use outbox::enqueue_item;
pub(crate) use request_repo::upsert_request;
pub(crate) use task_repo::upsert_task;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use uuid::Uuid;

use crate::error::StoreError;

/// Generates ids for every locally created entity.
///
/// UUIDv7 is time-ordered with 74 random bits, so ids minted offline on
/// different devices do not collide.
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

/// Opens (creating if needed) the database file and runs migrations.
pub async fn init_db(path: impl AsRef<Path>) -> Result<SqlitePool, StoreError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!("Opened database at {}", path.display());
    Ok(pool)
}

/// In-memory database on a single connection (every connection would
/// otherwise get its own empty database).
pub async fn init_memory_db() -> Result<SqlitePool, StoreError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

pub(crate) fn parse_uuid(field: &'static str, raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::corrupt(field, raw, e))
}

pub(crate) fn parse_time(
    field: &'static str,
    id: &str,
    raw: &str,
) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(field, id, e))
}
