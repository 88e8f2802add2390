use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::parse_time;
use crate::error::StoreError;

const LAST_DRAIN_KEY: &str = "last_drain_at";
const DRAIN_LEASE: &str = "drain";

/// Small key/value table for engine bookkeeping.
#[derive(Debug, Clone)]
pub struct SyncStateRepo {
    pool: SqlitePool,
}

impl SyncStateRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Wall-clock time of the last drain pass that emptied its snapshot.
    pub async fn last_drain_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM sync_state WHERE key = ?")
            .bind(LAST_DRAIN_KEY)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(raw,)| parse_time("value", LAST_DRAIN_KEY, &raw))
            .transpose()
    }

    pub async fn record_drain(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sync_state (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(LAST_DRAIN_KEY)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Takes or renews the drain lease for `owner` until `now + ttl`.
    ///
    /// Succeeds when the lease is free, expired, or already held by `owner`.
    /// Check and write are one statement, so two processes on the same file
    /// cannot both win.
    pub async fn try_acquire_drain_lease(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO drain_lease (name, owner, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET owner = excluded.owner, expires_at = excluded.expires_at
            WHERE drain_lease.owner = excluded.owner OR drain_lease.expires_at <= ?
            "#,
        )
        .bind(DRAIN_LEASE)
        .bind(owner)
        .bind((now + ttl).timestamp_millis())
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Drops the lease if `owner` still holds it.
    pub async fn release_drain_lease(&self, owner: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM drain_lease WHERE name = ? AND owner = ?")
            .bind(DRAIN_LEASE)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;

    #[tokio::test]
    async fn test_last_drain_round_trip() {
        let repo = SyncStateRepo::new(init_memory_db().await.unwrap());
        assert!(repo.last_drain_at().await.unwrap().is_none());

        let first = Utc::now();
        repo.record_drain(first).await.unwrap();
        let later = first + chrono::Duration::seconds(30);
        repo.record_drain(later).await.unwrap();

        assert_eq!(repo.last_drain_at().await.unwrap(), Some(later));
    }

    #[tokio::test]
    async fn test_drain_lease_excludes_other_owners() {
        let repo = SyncStateRepo::new(init_memory_db().await.unwrap());
        let now = Utc::now();
        let ttl = chrono::Duration::seconds(30);

        assert!(repo.try_acquire_drain_lease("a", now, ttl).await.unwrap());
        assert!(!repo.try_acquire_drain_lease("b", now, ttl).await.unwrap());
        // the holder can renew
        assert!(repo.try_acquire_drain_lease("a", now, ttl).await.unwrap());

        // releasing someone else's lease does nothing
        repo.release_drain_lease("b").await.unwrap();
        assert!(!repo.try_acquire_drain_lease("b", now, ttl).await.unwrap());

        repo.release_drain_lease("a").await.unwrap();
        assert!(repo.try_acquire_drain_lease("b", now, ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_drain_lease_can_be_taken_over() {
        let repo = SyncStateRepo::new(init_memory_db().await.unwrap());
        let now = Utc::now();
        let ttl = chrono::Duration::seconds(30);

        assert!(repo.try_acquire_drain_lease("crashed", now, ttl).await.unwrap());
        let later = now + chrono::Duration::seconds(31);
        assert!(repo.try_acquire_drain_lease("fresh", later, ttl).await.unwrap());
        assert!(!repo.try_acquire_drain_lease("crashed", later, ttl).await.unwrap());
    }
}
