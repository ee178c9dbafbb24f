//! Terminal errors of the auctioneer loop.

use auctioneer_bbs::BbsError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that end `Auctioneer::run` or prevent construction.
///
/// Failures while processing a single placement request never surface here.
#[derive(Debug, Error)]
pub enum AuctioneerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to request the auctioneer lock")]
    AcquireLock(#[source] BbsError),

    #[error("failed to release the auctioneer lock")]
    ReleaseLock(#[source] BbsError),
}
