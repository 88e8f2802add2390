mod location;
mod request_status;
mod rescue_request;
mod sync_item;
mod urgency;
mod user;
mod volunteer_task;

pub use location::Location;
pub use request_status::RequestStatus;
pub use rescue_request::{RescueRequest, DEFAULT_CATEGORY};
pub use sync_item::{SyncAction, SyncQueueItem};
pub use urgency::Urgency;
pub use user::{Role, User};
pub use volunteer_task::VolunteerTask;
