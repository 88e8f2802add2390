//! Sync error types.

use thiserror::Error;

use crate::error::StoreError;

/// Failure of a single submission to the remote authority.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transient: network failure, timeout or server-side error.
    #[error("Remote authority unavailable: {0}")]
    Unavailable(String),

    /// The authority refused the item, e.g. on validation.
    #[error("Remote authority rejected item: {0}")]
    Rejected(String),
}

impl RemoteError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, RemoteError::Rejected(_))
    }
}

/// Why a drain pass stopped early.
#[derive(Error, Debug)]
pub enum DrainError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Storage failure during drain: {0}")]
    Storage(#[from] StoreError),

    /// The cross-process drain lease expired and another pass took it.
    #[error("Drain lease lost to another sync pass")]
    LeaseLost,
}
