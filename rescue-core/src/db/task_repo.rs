use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{parse_time, parse_uuid};
use crate::error::StoreError;
use crate::models::VolunteerTask;

/// Store for volunteer assignments.
#[derive(Debug, Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    request_id: String,
    volunteer_id: String,
    assigned_at: String,
    completed_at: Option<String>,
    notes: Option<String>,
    synced: bool,
}

impl TaskRow {
    fn into_task(self) -> Result<VolunteerTask, StoreError> {
        let completed_at = self
            .completed_at
            .as_deref()
            .map(|raw| parse_time("completed_at", &self.id, raw))
            .transpose()?;

        Ok(VolunteerTask {
            id: parse_uuid("id", &self.id)?,
            request_id: parse_uuid("request_id", &self.request_id)?,
            volunteer_id: self.volunteer_id,
            assigned_at: parse_time("assigned_at", &self.id, &self.assigned_at)?,
            completed_at,
            notes: self.notes,
            synced: self.synced,
        })
    }
}

pub(crate) async fn upsert_task(
    conn: &mut SqliteConnection,
    task: &VolunteerTask,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO volunteer_tasks (id, request_id, volunteer_id, assigned_at, completed_at, notes, synced)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            request_id = excluded.request_id,
            volunteer_id = excluded.volunteer_id,
            assigned_at = excluded.assigned_at,
            completed_at = excluded.completed_at,
            notes = excluded.notes,
            synced = excluded.synced
        "#,
    )
    .bind(task.id.to_string())
    .bind(task.request_id.to_string())
    .bind(&task.volunteer_id)
    .bind(task.assigned_at.to_rfc3339())
    .bind(task.completed_at.map(|t| t.to_rfc3339()))
    .bind(&task.notes)
    .bind(task.synced)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn put(&self, task: &VolunteerTask) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert_task(&mut conn, task).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<VolunteerTask>, StoreError> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM volunteer_tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TaskRow::into_task).transpose()
    }

    pub async fn list_for_request(&self, request_id: Uuid) -> Result<Vec<VolunteerTask>, StoreError> {
        let rows: Vec<TaskRow> =
            sqlx::query_as("SELECT * FROM volunteer_tasks WHERE request_id = ? ORDER BY rowid")
                .bind(request_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    pub async fn list_for_volunteer(
        &self,
        volunteer_id: &str,
    ) -> Result<Vec<VolunteerTask>, StoreError> {
        let rows: Vec<TaskRow> =
            sqlx::query_as("SELECT * FROM volunteer_tasks WHERE volunteer_id = ? ORDER BY rowid")
                .bind(volunteer_id)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    /// Returns false when the task does not exist.
    pub async fn mark_synced(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE volunteer_tasks SET synced = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
