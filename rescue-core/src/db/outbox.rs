//! Outbox queue of mutation intents awaiting acknowledgement.
//!
//! Items live in `sync_queue` ordered by an autoincrement `seq`, so the
//! snapshot order is exactly the enqueue order. Removal happens only after a
//! confirmed submission, which makes a crash anywhere in between safe to
//! resume from: the item is simply submitted again.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{parse_time, parse_uuid};
use crate::error::StoreError;
use crate::models::{SyncAction, SyncQueueItem};

#[derive(Debug, Clone)]
pub struct OutboxQueue {
    pool: SqlitePool,
}

/// An item the remote authority refused, parked out of the live queue.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub item: SyncQueueItem,
    pub reason: String,
    pub dead_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: String,
    body: String,
    enqueued_at: String,
}

impl QueueRow {
    fn into_item(self) -> Result<SyncQueueItem, StoreError> {
        let action: SyncAction = serde_json::from_str(&self.body)
            .map_err(|e| StoreError::corrupt("body", &self.id, e))?;

        Ok(SyncQueueItem {
            id: parse_uuid("id", &self.id)?,
            action,
            enqueued_at: parse_time("enqueued_at", &self.id, &self.enqueued_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DeadLetterRow {
    id: String,
    body: String,
    enqueued_at: String,
    reason: String,
    dead_at: String,
}

/// Appends an item at the tail on an existing connection.
pub(crate) async fn enqueue_item(
    conn: &mut SqliteConnection,
    item: &SyncQueueItem,
) -> Result<(), StoreError> {
    let body = serde_json::to_string(&item.action)?;

    sqlx::query(
        "INSERT INTO sync_queue (id, action, target_id, body, enqueued_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(item.id.to_string())
    .bind(item.action.tag())
    .bind(item.action.target_id().to_string())
    .bind(&body)
    .bind(item.enqueued_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl OutboxQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends at the tail. Semantically redundant items are all kept.
    pub async fn enqueue(&self, item: &SyncQueueItem) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        enqueue_item(&mut conn, item).await
    }

    /// All pending items in enqueue order, without removing them.
    pub async fn snapshot(&self) -> Result<Vec<SyncQueueItem>, StoreError> {
        let rows: Vec<QueueRow> =
            sqlx::query_as("SELECT id, body, enqueued_at FROM sync_queue ORDER BY seq")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(QueueRow::into_item).collect()
    }

    /// Deletes one item. Removing an id that is not queued is a no-op.
    pub async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sync_queue WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Whether a status update for the same record was queued after `item`.
    pub async fn has_later_status_update(&self, item: &SyncQueueItem) -> Result<bool, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM sync_queue
            WHERE target_id = ?
              AND action = 'UPDATE_STATUS'
              AND id != ?
              AND seq > COALESCE((SELECT seq FROM sync_queue WHERE id = ?), -1)
            "#,
        )
        .bind(item.action.target_id().to_string())
        .bind(item.id.to_string())
        .bind(item.id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Moves a refused item out of the live queue in one transaction.
    pub async fn dead_letter(&self, item: &SyncQueueItem, reason: &str) -> Result<(), StoreError> {
        let body = serde_json::to_string(&item.action)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO sync_dead_letter (id, action, target_id, body, enqueued_at, reason, dead_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.action.tag())
        .bind(item.action.target_id().to_string())
        .bind(&body)
        .bind(item.enqueued_at.to_rfc3339())
        .bind(reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM sync_queue WHERE id = ?")
            .bind(item.id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn dead_letters(&self) -> Result<Vec<DeadLetter>, StoreError> {
        let rows: Vec<DeadLetterRow> = sqlx::query_as(
            "SELECT id, body, enqueued_at, reason, dead_at FROM sync_dead_letter ORDER BY dead_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let dead_at = parse_time("dead_at", &row.id, &row.dead_at)?;
                let item = QueueRow {
                    id: row.id,
                    body: row.body,
                    enqueued_at: row.enqueued_at,
                }
                .into_item()?;
                Ok(DeadLetter {
                    item,
                    reason: row.reason,
                    dead_at,
                })
            })
            .collect()
    }
}
