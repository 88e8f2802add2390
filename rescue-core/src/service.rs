//! Domain mutations: every write lands in the store and the outbox together.

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::classify::{enrich, Classifier};
use crate::db::{enqueue_item, upsert_request, upsert_task, RequestStore, TaskStore};
use crate::error::StoreError;
use crate::models::{
    Location, RequestStatus, RescueRequest, Role, SyncAction, SyncQueueItem, Urgency, User,
    VolunteerTask,
};
use crate::sync::ConnectivityGate;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Request not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Cannot move request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("{role} users cannot {action}")]
    Forbidden { role: Role, action: &'static str },
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Storage(StoreError::Database(e))
    }
}

/// What the user typed in for a new request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub description: String,
    pub urgency: Urgency,
    pub people_count: u32,
    pub location: Option<Location>,
}

impl NewRequest {
    pub fn new(description: impl Into<String>, urgency: Urgency) -> Self {
        Self {
            description: description.into(),
            urgency,
            people_count: 1,
            location: None,
        }
    }

    pub fn with_people_count(mut self, people_count: u32) -> Self {
        self.people_count = people_count;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.description.trim().is_empty() {
            return Err(ServiceError::Validation(
                "description cannot be empty".to_string(),
            ));
        }
        if self.people_count == 0 {
            return Err(ServiceError::Validation(
                "people count must be at least 1".to_string(),
            ));
        }
        if let Some(location) = &self.location {
            if !location.is_valid() {
                return Err(ServiceError::Validation(format!(
                    "coordinates out of range: {}",
                    location
                )));
            }
        }
        Ok(())
    }
}

/// Create/mutate call path for requests and volunteer tasks.
///
/// Each operation commits the record change and its sync item in a single
/// transaction, so a crash never leaves one without the other.
#[derive(Clone)]
pub struct RescueService {
    pool: SqlitePool,
    requests: RequestStore,
    tasks: TaskStore,
    connectivity: ConnectivityGate,
    classifier: Option<Arc<dyn Classifier>>,
}

impl RescueService {
    pub fn new(pool: SqlitePool, connectivity: ConnectivityGate) -> Self {
        Self {
            requests: RequestStore::new(pool.clone()),
            tasks: TaskStore::new(pool.clone()),
            pool,
            connectivity,
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub async fn get(&self, id: Uuid) -> Result<RescueRequest, ServiceError> {
        self.requests
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<RescueRequest>, ServiceError> {
        Ok(self.requests.get_all().await?)
    }

    pub async fn tasks_for_request(&self, request_id: Uuid) -> Result<Vec<VolunteerTask>, ServiceError> {
        Ok(self.tasks.list_for_request(request_id).await?)
    }

    pub async fn tasks_for_volunteer(&self, volunteer_id: &str) -> Result<Vec<VolunteerTask>, ServiceError> {
        Ok(self.tasks.list_for_volunteer(volunteer_id).await?)
    }

    /// Records a new request and queues it for the authority.
    ///
    /// The classifier is consulted only while online; offline requests keep
    /// the user's urgency and the default category.
    pub async fn create_request(
        &self,
        requester: &User,
        input: NewRequest,
    ) -> Result<RescueRequest, ServiceError> {
        input.validate()?;

        let classification = match &self.classifier {
            Some(classifier) if self.connectivity.is_online() => {
                classifier.classify(&input.description).await
            }
            _ => None,
        };
        let (category, urgency) = enrich(input.urgency, classification.as_ref());

        let mut request = RescueRequest::new(requester, input.description, urgency)
            .with_category(category)
            .with_people_count(input.people_count);
        if let Some(location) = input.location {
            request = request.with_location(location);
        }

        let item = SyncQueueItem::new(SyncAction::CreateRequest(request.clone()));
        let mut tx = self.pool.begin().await?;
        upsert_request(&mut *tx, &request).await?;
        enqueue_item(&mut *tx, &item).await?;
        tx.commit().await?;

        tracing::debug!(
            "Created request {} ({}, {})",
            request.id,
            request.category,
            request.urgency
        );
        Ok(request)
    }

    /// A responder takes a pending or assigned request and starts work.
    pub async fn accept(&self, user: &User, id: Uuid) -> Result<RescueRequest, ServiceError> {
        require_responder(user, "accept requests")?;
        self.update_status(id, RequestStatus::InProgress).await
    }

    pub async fn complete(&self, user: &User, id: Uuid) -> Result<RescueRequest, ServiceError> {
        require_responder(user, "complete requests")?;
        let request = self.get(id).await?;
        check_transition(request.status, RequestStatus::Completed)?;
        if request.status == RequestStatus::Completed {
            return Ok(request);
        }

        let now = Utc::now();
        let open_tasks: Vec<VolunteerTask> = self
            .tasks
            .list_for_request(id)
            .await?
            .into_iter()
            .filter(|t| !t.is_completed())
            .map(|mut t| {
                t.completed_at = Some(now);
                t
            })
            .collect();

        let request = RescueRequest {
            status: RequestStatus::Completed,
            ..request
        };
        let item = SyncQueueItem::new(SyncAction::UpdateStatus {
            request_id: id,
            status: RequestStatus::Completed,
        });

        let mut tx = self.pool.begin().await?;
        upsert_request(&mut *tx, &request).await?;
        for task in &open_tasks {
            upsert_task(&mut *tx, task).await?;
        }
        enqueue_item(&mut *tx, &item).await?;
        tx.commit().await?;

        Ok(request)
    }

    /// Sets a new status and queues the change. Re-applying the current
    /// status changes nothing and queues nothing.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<RescueRequest, ServiceError> {
        let request = self.get(id).await?;
        check_transition(request.status, status)?;
        if request.status == status {
            return Ok(request);
        }

        let request = RescueRequest { status, ..request };
        let item = SyncQueueItem::new(SyncAction::UpdateStatus {
            request_id: id,
            status,
        });

        let mut tx = self.pool.begin().await?;
        upsert_request(&mut *tx, &request).await?;
        enqueue_item(&mut *tx, &item).await?;
        tx.commit().await?;

        tracing::debug!("Request {} moved to {}", id, status);
        Ok(request)
    }

    /// Assigns a volunteer to a request.
    ///
    /// Admins may assign anyone; volunteers may only assign themselves.
    pub async fn assign_task(
        &self,
        user: &User,
        request_id: Uuid,
        volunteer_id: &str,
        notes: Option<String>,
    ) -> Result<VolunteerTask, ServiceError> {
        match user.role {
            Role::Admin => {}
            Role::Volunteer if user.id == volunteer_id => {}
            Role::Volunteer => {
                return Err(ServiceError::Forbidden {
                    role: user.role,
                    action: "assign other volunteers",
                })
            }
            Role::Citizen => {
                return Err(ServiceError::Forbidden {
                    role: user.role,
                    action: "assign volunteers",
                })
            }
        }
        if volunteer_id.trim().is_empty() {
            return Err(ServiceError::Validation(
                "volunteer id cannot be empty".to_string(),
            ));
        }

        let request = self.get(request_id).await?;
        if !request.status.is_open() {
            return Err(ServiceError::InvalidTransition {
                from: request.status,
                to: RequestStatus::Assigned,
            });
        }

        let mut task = VolunteerTask::new(request_id, volunteer_id);
        if let Some(notes) = notes {
            task = task.with_notes(notes);
        }

        let mut tx = self.pool.begin().await?;
        upsert_task(&mut *tx, &task).await?;
        enqueue_item(&mut *tx, &SyncQueueItem::new(SyncAction::AssignTask(task.clone()))).await?;
        // Later assignments to work already under way leave the status alone.
        if request.status == RequestStatus::Pending {
            let request = RescueRequest {
                status: RequestStatus::Assigned,
                ..request
            };
            upsert_request(&mut *tx, &request).await?;
            enqueue_item(
                &mut *tx,
                &SyncQueueItem::new(SyncAction::UpdateStatus {
                    request_id,
                    status: RequestStatus::Assigned,
                }),
            )
            .await?;
        }
        tx.commit().await?;

        tracing::debug!("Assigned {} to request {}", volunteer_id, request_id);
        Ok(task)
    }
}

fn require_responder(user: &User, action: &'static str) -> Result<(), ServiceError> {
    if user.role.can_respond() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden {
            role: user.role,
            action,
        })
    }
}

fn check_transition(from: RequestStatus, to: RequestStatus) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition { from, to })
    }
}
