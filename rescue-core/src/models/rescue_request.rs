use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::location::Location;
use super::request_status::RequestStatus;
use super::urgency::Urgency;
use super::user::User;
use crate::db::new_id;

/// Category assigned when no classification is available.
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescueRequest {
    pub id: Uuid,
    pub requester_id: String,
    pub requester_name: String,
    pub requester_phone: String,
    pub description: String,
    pub category: String,
    pub urgency: Urgency,
    pub people_count: u32,
    pub location: Location,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    /// Accepted by the remote authority at least once.
    pub synced: bool,
    pub sms_sent: bool,
}

impl RescueRequest {
    pub fn new(requester: &User, description: impl Into<String>, urgency: Urgency) -> Self {
        Self {
            id: new_id(),
            requester_id: requester.id.clone(),
            requester_name: requester.name.clone(),
            requester_phone: requester.phone.clone(),
            description: description.into(),
            category: DEFAULT_CATEGORY.to_string(),
            urgency,
            people_count: 1,
            location: Location::manual_entry(),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            synced: false,
            sms_sent: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_people_count(mut self, people_count: u32) -> Self {
        self.people_count = people_count;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

impl fmt::Display for RescueRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!("{} request from {}", self.category, self.requester_name);
        writeln!(f, "{}", title)?;
        writeln!(f, "{}", "=".repeat(title.len()))?;
        writeln!(f, "ID:       {}", self.id)?;
        writeln!(f, "Urgency:  {}", self.urgency)?;
        writeln!(f, "Status:   {}", self.status)?;
        writeln!(f, "People:   {}", self.people_count)?;
        writeln!(f, "Location: {}", self.location)?;
        if !self.requester_phone.is_empty() {
            writeln!(f, "Contact:  {}", self.requester_phone)?;
        }
        writeln!(
            f,
            "Created:  {}",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(
            f,
            "Sync:     {}",
            if self.synced { "synced" } else { "pending" }
        )?;

        if !self.description.is_empty() {
            writeln!(f, "\n{}", self.description)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn citizen() -> User {
        User::new("u-1", Role::Citizen)
            .with_name("Asha")
            .with_phone("+15550100")
    }

    #[test]
    fn test_new_request_defaults() {
        let req = RescueRequest::new(&citizen(), "Water rising fast", Urgency::Medium);

        assert_eq!(req.requester_id, "u-1");
        assert_eq!(req.requester_name, "Asha");
        assert_eq!(req.category, DEFAULT_CATEGORY);
        assert_eq!(req.status, RequestStatus::Pending);
        assert_eq!(req.people_count, 1);
        assert!(!req.synced);
        assert!(!req.sms_sent);
    }

    #[test]
    fn test_ids_are_unique_v7() {
        let a = RescueRequest::new(&citizen(), "a", Urgency::Low);
        let b = RescueRequest::new(&citizen(), "b", Urgency::Low);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.get_version_num(), 7);
    }

    #[test]
    fn test_display_marks_pending_sync() {
        let req = RescueRequest::new(&citizen(), "Roof collapsed", Urgency::Critical)
            .with_people_count(4)
            .with_location(Location::new(10.0, 20.0));

        let output = req.to_string();
        assert!(output.contains("General request from Asha"));
        assert!(output.contains("critical"));
        assert!(output.contains("People:   4"));
        assert!(output.contains("pending"));
    }
}
