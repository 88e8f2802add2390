//! Authoritative storage for the reference sync server.
//!
//! Records are kept as JSON bodies keyed by id in SQLite. Every applied sync
//! item id is written to `accepted_items` in the same transaction as its
//! effect, so a client that resubmits after a lost acknowledgement gets a
//! duplicate ack instead of a second application.

use chrono::Utc;
use rescue_core::{RequestStatus, RescueRequest, SyncAction, SyncQueueItem, VolunteerTask};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::SqliteConnection;
use std::path::Path;
use uuid::Uuid;

/// Result of applying one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    New,
    Duplicate,
}

/// Errors that can occur while applying or reading records.
#[derive(Debug)]
pub enum AuthorityError {
    /// The item is well formed but not acceptable.
    Rejected(String),
    Database(sqlx::Error),
    Migration(sqlx::migrate::MigrateError),
    Corrupt(String),
}

impl std::fmt::Display for AuthorityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorityError::Rejected(reason) => write!(f, "{}", reason),
            AuthorityError::Database(e) => write!(f, "Database error: {}", e),
            AuthorityError::Migration(e) => write!(f, "Migration error: {}", e),
            AuthorityError::Corrupt(e) => write!(f, "Corrupt stored record: {}", e),
        }
    }
}

impl std::error::Error for AuthorityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthorityError::Database(e) => Some(e),
            AuthorityError::Migration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AuthorityError {
    fn from(e: sqlx::Error) -> Self {
        AuthorityError::Database(e)
    }
}

impl From<sqlx::migrate::MigrateError> for AuthorityError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AuthorityError::Migration(e)
    }
}

#[derive(Debug, Clone)]
pub struct AuthorityStore {
    pool: SqlitePool,
}

impl AuthorityStore {
    /// Opens `authority.db` under `data_dir`, creating it if needed.
    pub async fn open(data_dir: &Path) -> Result<Self, AuthorityError> {
        let options = SqliteConnectOptions::new()
            .filename(data_dir.join("authority.db"))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn open_in_memory() -> Result<Self, AuthorityError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Applies an item exactly once per item id.
    pub async fn apply(&self, item: &SyncQueueItem) -> Result<Applied, AuthorityError> {
        let mut tx = self.pool.begin().await?;

        let seen: Option<(String,)> = sqlx::query_as("SELECT id FROM accepted_items WHERE id = ?")
            .bind(item.id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        if seen.is_some() {
            return Ok(Applied::Duplicate);
        }

        match &item.action {
            SyncAction::CreateRequest(request) => {
                validate_request(request)?;
                let stored = RescueRequest {
                    synced: true,
                    ..request.clone()
                };
                write_request(&mut *tx, &stored).await?;
            }
            SyncAction::UpdateStatus { request_id, status } => {
                let request = read_request(&mut *tx, *request_id)
                    .await?
                    .ok_or_else(|| unknown_request(*request_id))?;
                if !request.status.can_transition_to(*status) {
                    // Last write wins across devices; note it and carry on.
                    tracing::info!(
                        "Request {} overwritten from {} to {}",
                        request_id,
                        request.status,
                        status
                    );
                }
                let updated = RescueRequest {
                    status: *status,
                    ..request
                };
                write_request(&mut *tx, &updated).await?;
                if *status == RequestStatus::Completed {
                    complete_tasks(&mut *tx, *request_id).await?;
                }
            }
            SyncAction::AssignTask(task) => {
                if read_request(&mut *tx, task.request_id).await?.is_none() {
                    return Err(unknown_request(task.request_id));
                }
                let stored = VolunteerTask {
                    synced: true,
                    ..task.clone()
                };
                write_task(&mut *tx, &stored).await?;
            }
        }

        sqlx::query(
            "INSERT INTO accepted_items (id, action, target_id, accepted_at) VALUES (?, ?, ?, ?)",
        )
        .bind(item.id.to_string())
        .bind(item.action.tag())
        .bind(item.action.target_id().to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!("Applied {} item {}", item.action.tag(), item.id);
        Ok(Applied::New)
    }

    pub async fn get_request(&self, id: Uuid) -> Result<Option<RescueRequest>, AuthorityError> {
        let mut conn = self.pool.acquire().await?;
        read_request(&mut conn, id).await
    }

    /// Every request, oldest first.
    pub async fn list_requests(&self) -> Result<Vec<RescueRequest>, AuthorityError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT body FROM requests ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|(body,)| decode(&body)).collect()
    }

    pub async fn tasks_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<Vec<VolunteerTask>, AuthorityError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT body FROM volunteer_tasks WHERE request_id = ? ORDER BY rowid")
                .bind(request_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(|(body,)| decode(&body)).collect()
    }

    pub async fn accepted_count(&self) -> Result<u64, AuthorityError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accepted_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

fn validate_request(request: &RescueRequest) -> Result<(), AuthorityError> {
    if request.people_count == 0 {
        return Err(AuthorityError::Rejected(
            "people_count must be at least 1".to_string(),
        ));
    }
    if request.description.trim().is_empty() {
        return Err(AuthorityError::Rejected(
            "description cannot be empty".to_string(),
        ));
    }
    if !request.location.is_valid() {
        return Err(AuthorityError::Rejected(format!(
            "coordinates out of range: {}",
            request.location
        )));
    }
    Ok(())
}

fn unknown_request(id: Uuid) -> AuthorityError {
    AuthorityError::Rejected(format!("unknown request {}", id))
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, AuthorityError> {
    serde_json::from_str(body).map_err(|e| AuthorityError::Corrupt(e.to_string()))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, AuthorityError> {
    serde_json::to_string(value).map_err(|e| AuthorityError::Corrupt(e.to_string()))
}

async fn read_request(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<RescueRequest>, AuthorityError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT body FROM requests WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.map(|(body,)| decode(&body)).transpose()
}

async fn write_request(
    conn: &mut SqliteConnection,
    request: &RescueRequest,
) -> Result<(), AuthorityError> {
    sqlx::query(
        r#"
        INSERT INTO requests (id, status, body, updated_at) VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            body = excluded.body,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(request.id.to_string())
    .bind(request.status.as_str())
    .bind(encode(request)?)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_task(conn: &mut SqliteConnection, task: &VolunteerTask) -> Result<(), AuthorityError> {
    sqlx::query(
        r#"
        INSERT INTO volunteer_tasks (id, request_id, body, updated_at) VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            body = excluded.body,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(task.id.to_string())
    .bind(task.request_id.to_string())
    .bind(encode(task)?)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn complete_tasks(conn: &mut SqliteConnection, request_id: Uuid) -> Result<(), AuthorityError> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT body FROM volunteer_tasks WHERE request_id = ?")
        .bind(request_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    let now = Utc::now();
    for (body,) in rows {
        let mut task: VolunteerTask = decode(&body)?;
        if task.completed_at.is_none() {
            task.completed_at = Some(now);
            write_task(conn, &task).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescue_core::{Role, Urgency, User};
    use tempfile::TempDir;

    fn sample_request() -> RescueRequest {
        let user = User::new("c-1", Role::Citizen).with_name("Nadia");
        RescueRequest::new(&user, "Cut off by landslide", Urgency::High).with_people_count(5)
    }

    fn create_item(request: &RescueRequest) -> SyncQueueItem {
        SyncQueueItem::new(SyncAction::CreateRequest(request.clone()))
    }

    #[tokio::test]
    async fn test_create_is_stored_as_synced() {
        let store = AuthorityStore::open_in_memory().await.unwrap();
        let request = sample_request();

        assert_eq!(store.apply(&create_item(&request)).await.unwrap(), Applied::New);

        let stored = store.get_request(request.id).await.unwrap().unwrap();
        assert!(stored.synced);
        assert_eq!(stored.description, request.description);
        assert_eq!(store.list_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replayed_item_is_duplicate_and_not_reapplied() {
        let store = AuthorityStore::open_in_memory().await.unwrap();
        let request = sample_request();
        let create = create_item(&request);
        store.apply(&create).await.unwrap();
        store
            .apply(&SyncQueueItem::new(SyncAction::UpdateStatus {
                request_id: request.id,
                status: RequestStatus::Completed,
            }))
            .await
            .unwrap();

        // a resubmitted create must not reset the status to pending
        assert_eq!(store.apply(&create).await.unwrap(), Applied::Duplicate);

        let stored = store.get_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Completed);
        assert_eq!(store.accepted_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_create_is_rejected() {
        let store = AuthorityStore::open_in_memory().await.unwrap();
        let mut request = sample_request();
        request.people_count = 0;

        let err = store.apply(&create_item(&request)).await.unwrap_err();
        assert!(matches!(err, AuthorityError::Rejected(_)));
        assert!(store.get_request(request.id).await.unwrap().is_none());
        assert_eq!(store.accepted_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_status_for_unknown_request_is_rejected() {
        let store = AuthorityStore::open_in_memory().await.unwrap();
        let item = SyncQueueItem::new(SyncAction::UpdateStatus {
            request_id: Uuid::now_v7(),
            status: RequestStatus::InProgress,
        });

        assert!(matches!(
            store.apply(&item).await,
            Err(AuthorityError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_assignment_and_completion() {
        let store = AuthorityStore::open_in_memory().await.unwrap();
        let request = sample_request();
        store.apply(&create_item(&request)).await.unwrap();

        let task = VolunteerTask::new(request.id, "v-3");
        store
            .apply(&SyncQueueItem::new(SyncAction::AssignTask(task.clone())))
            .await
            .unwrap();
        store
            .apply(&SyncQueueItem::new(SyncAction::UpdateStatus {
                request_id: request.id,
                status: RequestStatus::Completed,
            }))
            .await
            .unwrap();

        let tasks = store.tasks_for_request(request.id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].synced);
        assert!(tasks[0].is_completed());
    }

    #[tokio::test]
    async fn test_open_on_disk_persists() {
        let temp_dir = TempDir::new().unwrap();
        let request = sample_request();

        let store = AuthorityStore::open(temp_dir.path()).await.unwrap();
        store.apply(&create_item(&request)).await.unwrap();
        drop(store);

        let reopened = AuthorityStore::open(temp_dir.path()).await.unwrap();
        assert!(reopened.get_request(request.id).await.unwrap().is_some());
    }
}
