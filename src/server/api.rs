//! HTTP surface of the reference authority.
//!
//! - `GET /health`: liveness probe used by clients as their online signal
//! - `POST /sync/items`: apply one sync item, `{"duplicate": bool}` on success
//! - `GET /requests`, `GET /requests/{id}`: read back authoritative records

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rescue_core::{Ack, RescueRequest, SyncQueueItem, VolunteerTask};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::storage::{Applied, AuthorityError, AuthorityStore};

#[derive(Clone)]
pub struct AppState {
    pub store: AuthorityStore,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sync/items", post(submit_item))
        .route("/requests", get(list_requests))
        .route("/requests/{id}", get(get_request))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

impl IntoResponse for AuthorityError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthorityError::Rejected(_) => (StatusCode::UNPROCESSABLE_ENTITY, "rejected"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
        };
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (
            status,
            Json(json!({ "error": code, "message": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn submit_item(
    State(state): State<AppState>,
    Json(item): Json<SyncQueueItem>,
) -> Result<Json<Ack>, AuthorityError> {
    let applied = state.store.apply(&item).await.map_err(|e| {
        if let AuthorityError::Rejected(reason) = &e {
            tracing::info!("Rejected {} item {}: {}", item.action.tag(), item.id, reason);
        }
        e
    })?;

    Ok(Json(Ack {
        duplicate: applied == Applied::Duplicate,
    }))
}

async fn list_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<RescueRequest>>, AuthorityError> {
    Ok(Json(state.store.list_requests().await?))
}

#[derive(Serialize)]
struct RequestDetail {
    request: RescueRequest,
    tasks: Vec<VolunteerTask>,
}

async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AuthorityError> {
    let Some(request) = state.store.get_request(id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "not_found", "message": format!("unknown request {}", id) })),
        )
            .into_response());
    };
    let tasks = state.store.tasks_for_request(id).await?;
    Ok(Json(RequestDetail { request, tasks }).into_response())
}
