use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request_status::RequestStatus;
use super::rescue_request::RescueRequest;
use super::volunteer_task::VolunteerTask;
use crate::db::new_id;

/// A mutation intent and its payload. The tag set is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncAction {
    CreateRequest(RescueRequest),
    UpdateStatus {
        request_id: Uuid,
        status: RequestStatus,
    },
    AssignTask(VolunteerTask),
}

impl SyncAction {
    pub fn tag(&self) -> &'static str {
        match self {
            SyncAction::CreateRequest(_) => "CREATE_REQUEST",
            SyncAction::UpdateStatus { .. } => "UPDATE_STATUS",
            SyncAction::AssignTask(_) => "ASSIGN_TASK",
        }
    }

    /// Id of the local record this intent mutates.
    pub fn target_id(&self) -> Uuid {
        match self {
            SyncAction::CreateRequest(request) => request.id,
            SyncAction::UpdateStatus { request_id, .. } => *request_id,
            SyncAction::AssignTask(task) => task.id,
        }
    }
}

/// A durable entry in the outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    pub id: Uuid,
    #[serde(flatten)]
    pub action: SyncAction,
    pub enqueued_at: DateTime<Utc>,
}

impl SyncQueueItem {
    pub fn new(action: SyncAction) -> Self {
        Self {
            id: new_id(),
            action,
            enqueued_at: Utc::now(),
        }
    }
}
