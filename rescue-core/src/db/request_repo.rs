use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{parse_time, parse_uuid};
use crate::error::StoreError;
use crate::models::{Location, RequestStatus, RescueRequest, Urgency};

/// Durable record store for rescue requests.
#[derive(Debug, Clone)]
pub struct RequestStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: String,
    requester_id: String,
    requester_name: String,
    requester_phone: String,
    description: String,
    category: String,
    urgency: String,
    people_count: i64,
    latitude: f64,
    longitude: f64,
    location_label: Option<String>,
    status: String,
    created_at: String,
    synced: bool,
    sms_sent: bool,
}

impl RequestRow {
    fn into_request(self) -> Result<RescueRequest, StoreError> {
        let id = parse_uuid("id", &self.id)?;
        let urgency: Urgency = self
            .urgency
            .parse()
            .map_err(|e: String| StoreError::corrupt("urgency", &self.id, e))?;
        let status: RequestStatus = self
            .status
            .parse()
            .map_err(|e: String| StoreError::corrupt("status", &self.id, e))?;
        let people_count = u32::try_from(self.people_count)
            .map_err(|e| StoreError::corrupt("people_count", &self.id, e))?;
        let created_at = parse_time("created_at", &self.id, &self.created_at)?;

        Ok(RescueRequest {
            id,
            requester_id: self.requester_id,
            requester_name: self.requester_name,
            requester_phone: self.requester_phone,
            description: self.description,
            category: self.category,
            urgency,
            people_count,
            location: Location {
                latitude: self.latitude,
                longitude: self.longitude,
                label: self.location_label,
            },
            status,
            created_at,
            synced: self.synced,
            sms_sent: self.sms_sent,
        })
    }
}

/// Inserts or overwrites a request on an existing connection, so callers can
/// pair it with an outbox append inside one transaction.
///
/// An overwrite keeps the row's rowid, and with it the record's position in
/// insertion order.
pub(crate) async fn upsert_request(
    conn: &mut SqliteConnection,
    request: &RescueRequest,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO requests (
            id, requester_id, requester_name, requester_phone, description, category,
            urgency, people_count, latitude, longitude, location_label, status,
            created_at, synced, sms_sent
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            requester_id = excluded.requester_id,
            requester_name = excluded.requester_name,
            requester_phone = excluded.requester_phone,
            description = excluded.description,
            category = excluded.category,
            urgency = excluded.urgency,
            people_count = excluded.people_count,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            location_label = excluded.location_label,
            status = excluded.status,
            created_at = excluded.created_at,
            synced = excluded.synced,
            sms_sent = excluded.sms_sent
        "#,
    )
    .bind(request.id.to_string())
    .bind(&request.requester_id)
    .bind(&request.requester_name)
    .bind(&request.requester_phone)
    .bind(&request.description)
    .bind(&request.category)
    .bind(request.urgency.as_str())
    .bind(i64::from(request.people_count))
    .bind(request.location.latitude)
    .bind(request.location.longitude)
    .bind(&request.location.label)
    .bind(request.status.as_str())
    .bind(request.created_at.to_rfc3339())
    .bind(request.synced)
    .bind(request.sms_sent)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl RequestStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upserts a request. The write is committed when this returns.
    pub async fn put(&self, request: &RescueRequest) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert_request(&mut conn, request).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<RescueRequest>, StoreError> {
        let row: Option<RequestRow> = sqlx::query_as("SELECT * FROM requests WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(RequestRow::into_request).transpose()
    }

    /// Every stored request, in insertion order.
    pub async fn get_all(&self) -> Result<Vec<RescueRequest>, StoreError> {
        let rows: Vec<RequestRow> = sqlx::query_as("SELECT * FROM requests ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(RequestRow::into_request).collect()
    }

    /// Sets `synced` without touching any other field.
    ///
    /// Returns false when the record does not exist.
    pub async fn mark_synced(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE requests SET synced = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Applies an acknowledged status and marks the record synced.
    ///
    /// Returns false when the record does not exist.
    pub async fn apply_status(&self, id: Uuid, status: RequestStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE requests SET status = ?, synced = 1 WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
