//! Coordination store error types.

use auctioneer_models::ProcessGuid;
use thiserror::Error;

/// Errors returned by coordination store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BbsError {
    /// Another owner claimed the placement request first.
    #[error("placement request {0} is already claimed")]
    AlreadyClaimed(ProcessGuid),

    /// The placement request was already resolved.
    #[error("placement request {0} is already resolved")]
    AlreadyResolved(ProcessGuid),

    /// Resolve was attempted on a request nobody claimed.
    #[error("placement request {0} is not claimed")]
    NotClaimed(ProcessGuid),

    /// The placement request does not exist.
    #[error("placement request {0} not found")]
    NotFound(ProcessGuid),

    /// A live placement request with the same key already exists.
    #[error("placement request {0} is already desired")]
    Duplicate(ProcessGuid),

    /// The caller does not hold or contend for the named lock.
    #[error("lock '{0}' is not held by this owner")]
    LockNotHeld(String),

    /// The watch feed reported an error.
    #[error("watch failed: {0}")]
    Watch(String),

    /// The store could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl BbsError {
    /// Returns true if the error means another owner won the claim.
    pub fn is_claim_conflict(&self) -> bool {
        matches!(self, Self::AlreadyClaimed(_) | Self::AlreadyResolved(_))
    }
}
