use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::new_id;

/// Links a volunteer to the request they are responding to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerTask {
    pub id: Uuid,
    pub request_id: Uuid,
    pub volunteer_id: String,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(default)]
    pub synced: bool,
}

impl VolunteerTask {
    pub fn new(request_id: Uuid, volunteer_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            request_id,
            volunteer_id: volunteer_id.into(),
            assigned_at: Utc::now(),
            completed_at: None,
            notes: None,
            synced: false,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}
