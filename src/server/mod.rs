//! Server-side modules for the RescueSync reference authority.

pub mod api;
pub mod storage;

pub use api::{router, AppState};
pub use storage::{Applied, AuthorityError, AuthorityStore};
