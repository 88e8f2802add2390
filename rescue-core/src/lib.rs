//! RescueSync Core Library
//!
//! Offline-first storage for rescue requests: a durable SQLite record store,
//! an outbox of pending mutations and the engine that drains it to a remote
//! authority when connectivity returns.

pub mod classify;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod sync;

pub use classify::{enrich, Classification, Classifier, HttpClassifier};
pub use db::{
    init_db, init_memory_db, new_id, DeadLetter, OutboxQueue, RequestStore, SyncStateRepo,
    TaskStore,
};
pub use error::StoreError;
pub use models::{
    Location, RequestStatus, RescueRequest, Role, SyncAction, SyncQueueItem, Urgency, User,
    VolunteerTask, DEFAULT_CATEGORY,
};
pub use service::{NewRequest, RescueService, ServiceError};
pub use sync::{
    check_server, spawn_auto_drain, Ack, ConnectivityGate, DrainError, DrainOutcome, EngineConfig,
    HttpAuthority, RejectionPolicy, RemoteAuthority, RemoteError, SyncEngine,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
