//! Storage error type shared by the record store and the outbox.

use thiserror::Error;

/// A durable read or write failed. Always fatal to the calling operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to create database directory '{path}': {source}")]
    Directory {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to encode sync payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Corrupt {field} in stored row {id}: {detail}")]
    Corrupt {
        field: &'static str,
        id: String,
        detail: String,
    },
}

impl StoreError {
    pub(crate) fn corrupt(field: &'static str, id: &str, detail: impl ToString) -> Self {
        StoreError::Corrupt {
            field,
            id: id.to_string(),
            detail: detail.to_string(),
        }
    }
}
