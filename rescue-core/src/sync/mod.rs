//! Outbox draining against the remote authority.

mod connectivity;
mod engine;
mod error;
mod remote;
#[cfg(test)]
pub(crate) mod testing;
mod trigger;

pub use connectivity::ConnectivityGate;
pub use engine::{DrainOutcome, EngineConfig, RejectionPolicy, SyncEngine, DEFAULT_SUBMIT_TIMEOUT};
pub use error::{DrainError, RemoteError};
pub use remote::{check_server, normalize_base_url, Ack, HttpAuthority, RemoteAuthority};
pub use trigger::spawn_auto_drain;
