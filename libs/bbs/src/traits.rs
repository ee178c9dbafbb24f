//! The store contract consumed by the auctioneer.

use async_trait::async_trait;
use auctioneer_models::{AuctioneerId, LockEvent, PlacementOutcome, PlacementRequest, Rep};
use tokio::sync::mpsc;

use crate::{BbsError, WatchSubscription};

/// Stream of leader-election notifications for one lock owner.
///
/// The first event may be either `Acquired` or `Lost`.
pub type LockEvents = mpsc::UnboundedReceiver<LockEvent>;

/// Coordination store operations used by the auctioneer.
#[async_trait]
pub trait AuctioneerBbs: Send + Sync + 'static {
    /// Start contending for the named lock on behalf of `owner`.
    async fn maintain_lock(&self, name: &str, owner: AuctioneerId) -> Result<LockEvents, BbsError>;

    /// Give up the named lock. Returns once the store has acknowledged.
    async fn release_lock(&self, name: &str, owner: AuctioneerId) -> Result<(), BbsError>;

    /// Open a feed of newly desired placement requests.
    ///
    /// Only one subscription is expected to be active per auctioneer.
    async fn watch_placement_requests(&self) -> Result<WatchSubscription, BbsError>;

    /// Assert exclusive ownership of a placement request.
    async fn claim_placement_request(
        &self,
        request: &PlacementRequest,
        owner: AuctioneerId,
    ) -> Result<(), BbsError>;

    /// Write the terminal outcome of a claimed placement request.
    async fn resolve_placement_request(
        &self,
        request: &PlacementRequest,
        outcome: &PlacementOutcome,
    ) -> Result<(), BbsError>;

    /// Snapshot of the reps currently present.
    async fn list_reps(&self) -> Result<Vec<Rep>, BbsError>;
}
