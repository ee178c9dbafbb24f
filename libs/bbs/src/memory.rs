//! In-memory coordination store.
//!
//! Implements the full `AuctioneerBbs` contract inside one process:
//! - lock arbitration: one holder per lock name, queued contenders promoted
//!   in arrival order when the holder releases or expires
//! - placement requests move `Pending -> Claimed -> Resolved`, and only the
//!   holder of the claim lock may claim
//! - new subscriptions are replayed every still-pending request
//! - resolved records are kept up to a retention limit, oldest evicted first
//!
//! Used by the auctioneer binary in development and by store-level tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use auctioneer_models::{
    AuctioneerId, LockEvent, PlacementOutcome, PlacementRequest, ProcessGuid, Rep, RepId,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{AuctioneerBbs, BbsError, LockEvents, WatchFeed, WatchSubscription};

/// Lifecycle state of a placement request record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    /// Desired and waiting for an auctioneer to claim it.
    Pending,
    /// Owned by an auctioneer running its auction.
    Claimed { owner: AuctioneerId },
    /// Terminal.
    Resolved { outcome: PlacementOutcome },
}

#[derive(Debug)]
struct RequestRecord {
    request: PlacementRequest,
    state: RequestState,
}

type Contender = (AuctioneerId, mpsc::UnboundedSender<LockEvent>);

#[derive(Debug, Default)]
struct LockRecord {
    holder: Option<Contender>,
    contenders: VecDeque<Contender>,
}

impl LockRecord {
    /// Hand the lock to the oldest contender that is still listening.
    fn promote(&mut self, name: &str) {
        while let Some((owner, tx)) = self.contenders.pop_front() {
            if tx.send(LockEvent::Acquired).is_ok() {
                info!(lock = %name, owner = %owner, "Lock acquired");
                self.holder = Some((owner, tx));
                return;
            }
            debug!(lock = %name, owner = %owner, "Skipping departed lock contender");
        }
    }
}

/// Lock that gates claims unless overridden with [`InMemoryBbs::with_claim_lock`].
pub const DEFAULT_CLAIM_LOCK: &str = "auctioneer";

/// Resolved records kept unless overridden with
/// [`InMemoryBbs::with_resolved_retention`].
pub const DEFAULT_RESOLVED_RETENTION: usize = 1024;

#[derive(Debug, Default)]
struct Inner {
    reps: BTreeMap<RepId, Rep>,
    requests: HashMap<ProcessGuid, RequestRecord>,
    /// Resolution order, oldest first.
    resolved: VecDeque<ProcessGuid>,
    watchers: Vec<WatchFeed>,
    locks: HashMap<String, LockRecord>,
}

impl Inner {
    fn holds_lock(&self, name: &str, owner: AuctioneerId) -> bool {
        self.locks
            .get(name)
            .and_then(|record| record.holder.as_ref())
            .is_some_and(|(holder, _)| *holder == owner)
    }

    /// Drop the oldest resolved records beyond `retention`.
    fn evict_resolved(&mut self, retention: usize) {
        while self.resolved.len() > retention {
            let Some(guid) = self.resolved.pop_front() else {
                break;
            };
            self.requests.remove(&guid);
            debug!(process_guid = %guid, "Resolved placement request evicted");
        }
    }
}

/// Single-process coordination store.
#[derive(Debug)]
pub struct InMemoryBbs {
    inner: Mutex<Inner>,
    claim_lock: String,
    resolved_retention: usize,
}

impl Default for InMemoryBbs {
    fn default() -> Self {
        Self {
            inner: Mutex::default(),
            claim_lock: DEFAULT_CLAIM_LOCK.to_string(),
            resolved_retention: DEFAULT_RESOLVED_RETENTION,
        }
    }
}

impl InMemoryBbs {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the holder of `name` may claim placement requests.
    pub fn with_claim_lock(mut self, name: impl Into<String>) -> Self {
        self.claim_lock = name.into();
        self
    }

    /// Keep at most `retention` resolved records.
    pub fn with_resolved_retention(mut self, retention: usize) -> Self {
        self.resolved_retention = retention;
        self
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the guard cannot leave a record half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register (or refresh) a rep's presence.
    pub fn register_rep(&self, rep: Rep) {
        debug!(rep_id = %rep.rep_id, stack = %rep.stack, "Rep registered");
        self.lock_inner().reps.insert(rep.rep_id.clone(), rep);
    }

    /// Remove a rep's presence. Returns true if it was present.
    pub fn unregister_rep(&self, rep_id: &RepId) -> bool {
        self.lock_inner().reps.remove(rep_id).is_some()
    }

    /// Record a new placement request and push it to every live watcher.
    ///
    /// A resolved request with the same key is replaced.
    pub fn desire_placement(&self, request: PlacementRequest) -> Result<(), BbsError> {
        let mut inner = self.lock_inner();

        if let Some(existing) = inner.requests.get(&request.process_guid) {
            if !matches!(existing.state, RequestState::Resolved { .. }) {
                return Err(BbsError::Duplicate(request.process_guid.clone()));
            }
        }

        if inner.requests.contains_key(&request.process_guid) {
            inner.resolved.retain(|guid| *guid != request.process_guid);
        }

        inner.watchers.retain(|feed| !feed.is_stopped());
        for feed in &inner.watchers {
            feed.send_request(request.clone());
        }

        debug!(
            process_guid = %request.process_guid,
            stack = %request.stack,
            watchers = inner.watchers.len(),
            "Placement request desired"
        );

        inner.requests.insert(
            request.process_guid.clone(),
            RequestRecord {
                request,
                state: RequestState::Pending,
            },
        );

        Ok(())
    }

    /// Current state of a placement request, if it exists.
    pub fn request_state(&self, process_guid: &ProcessGuid) -> Option<RequestState> {
        self.lock_inner()
            .requests
            .get(process_guid)
            .map(|record| record.state.clone())
    }

    /// Current holder of the named lock.
    pub fn lock_holder(&self, name: &str) -> Option<AuctioneerId> {
        self.lock_inner()
            .locks
            .get(name)
            .and_then(|record| record.holder.as_ref().map(|(owner, _)| *owner))
    }

    /// Number of subscriptions that have not been stopped.
    pub fn active_watchers(&self) -> usize {
        let mut inner = self.lock_inner();
        inner.watchers.retain(|feed| !feed.is_stopped());
        inner.watchers.len()
    }

    /// Expire the current holder's lock, as a lapsed lease would.
    ///
    /// The holder is told it lost the lock and re-queued as a contender; the
    /// oldest contender is then promoted (which may be the same owner).
    pub fn expire_lock(&self, name: &str) {
        let mut inner = self.lock_inner();
        let Some(record) = inner.locks.get_mut(name) else {
            return;
        };

        if let Some((owner, tx)) = record.holder.take() {
            warn!(lock = %name, owner = %owner, "Lock expired");
            if tx.send(LockEvent::Lost).is_ok() {
                record.contenders.push_back((owner, tx));
            }
        }

        record.promote(name);
    }

    /// Close every open subscription without error.
    pub fn close_watchers(&self) {
        let dropped = std::mem::take(&mut self.lock_inner().watchers);
        info!(count = dropped.len(), "Closing watch subscriptions");
    }
}

#[async_trait]
impl AuctioneerBbs for InMemoryBbs {
    async fn maintain_lock(&self, name: &str, owner: AuctioneerId) -> Result<LockEvents, BbsError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock_inner();
        let record = inner.locks.entry(name.to_string()).or_default();

        let held_by_other = record
            .holder
            .as_ref()
            .is_some_and(|(holder, _)| *holder != owner);

        if held_by_other {
            debug!(lock = %name, owner = %owner, "Lock busy, queued as contender");
            let _ = tx.send(LockEvent::Lost);
            record.contenders.push_back((owner, tx));
        } else {
            info!(lock = %name, owner = %owner, "Lock acquired");
            let _ = tx.send(LockEvent::Acquired);
            record.holder = Some((owner, tx));
        }

        Ok(rx)
    }

    async fn release_lock(&self, name: &str, owner: AuctioneerId) -> Result<(), BbsError> {
        let mut inner = self.lock_inner();
        let record = inner
            .locks
            .get_mut(name)
            .ok_or_else(|| BbsError::LockNotHeld(name.to_string()))?;

        if record.holder.as_ref().is_some_and(|(h, _)| *h == owner) {
            record.holder = None;
            info!(lock = %name, owner = %owner, "Lock released");
            record.promote(name);
            return Ok(());
        }

        let before = record.contenders.len();
        record.contenders.retain(|(c, _)| *c != owner);
        if record.contenders.len() < before {
            debug!(lock = %name, owner = %owner, "Lock contention withdrawn");
            return Ok(());
        }

        Err(BbsError::LockNotHeld(name.to_string()))
    }

    async fn watch_placement_requests(&self) -> Result<WatchSubscription, BbsError> {
        let (feed, subscription) = WatchSubscription::channel();
        let mut inner = self.lock_inner();

        let mut pending: Vec<&PlacementRequest> = inner
            .requests
            .values()
            .filter(|record| record.state == RequestState::Pending)
            .map(|record| &record.request)
            .collect();
        pending.sort_by(|a, b| a.process_guid.cmp(&b.process_guid));

        for request in &pending {
            feed.send_request((*request).clone());
        }

        debug!(replayed = pending.len(), "Watch subscription opened");
        inner.watchers.push(feed);

        Ok(subscription)
    }

    async fn claim_placement_request(
        &self,
        request: &PlacementRequest,
        owner: AuctioneerId,
    ) -> Result<(), BbsError> {
        let mut inner = self.lock_inner();
        if !inner.holds_lock(&self.claim_lock, owner) {
            return Err(BbsError::LockNotHeld(self.claim_lock.clone()));
        }

        let guid = &request.process_guid;
        let record = inner
            .requests
            .get_mut(guid)
            .ok_or_else(|| BbsError::NotFound(guid.clone()))?;

        match record.state {
            RequestState::Pending => {
                record.state = RequestState::Claimed { owner };
                Ok(())
            }
            RequestState::Claimed { .. } => Err(BbsError::AlreadyClaimed(guid.clone())),
            RequestState::Resolved { .. } => Err(BbsError::AlreadyResolved(guid.clone())),
        }
    }

    async fn resolve_placement_request(
        &self,
        request: &PlacementRequest,
        outcome: &PlacementOutcome,
    ) -> Result<(), BbsError> {
        let mut inner = self.lock_inner();
        let guid = &request.process_guid;
        let record = inner
            .requests
            .get_mut(guid)
            .ok_or_else(|| BbsError::NotFound(guid.clone()))?;

        match record.state {
            RequestState::Claimed { .. } => {
                record.state = RequestState::Resolved {
                    outcome: outcome.clone(),
                };
                inner.resolved.push_back(guid.clone());
                inner.evict_resolved(self.resolved_retention);
                Ok(())
            }
            RequestState::Pending => Err(BbsError::NotClaimed(guid.clone())),
            RequestState::Resolved { .. } => Err(BbsError::AlreadyResolved(guid.clone())),
        }
    }

    async fn list_reps(&self) -> Result<Vec<Rep>, BbsError> {
        Ok(self.lock_inner().reps.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(guid: &str) -> PlacementRequest {
        PlacementRequest::new(guid.parse().unwrap(), "lucid64".parse().unwrap())
    }

    /// A store whose claim lock is held by the returned owner.
    async fn held_store() -> (InMemoryBbs, AuctioneerId) {
        let bbs = InMemoryBbs::new();
        let owner = AuctioneerId::new();
        let _events = bbs.maintain_lock(DEFAULT_CLAIM_LOCK, owner).await.unwrap();
        (bbs, owner)
    }

    #[tokio::test]
    async fn test_claim_then_resolve() {
        let (bbs, owner) = held_store().await;
        let req = request("my-guid");
        bbs.desire_placement(req.clone()).unwrap();

        bbs.claim_placement_request(&req, owner).await.unwrap();
        assert_eq!(
            bbs.request_state(&req.process_guid),
            Some(RequestState::Claimed { owner })
        );

        bbs.resolve_placement_request(&req, &PlacementOutcome::Failed)
            .await
            .unwrap();
        assert_eq!(
            bbs.request_state(&req.process_guid),
            Some(RequestState::Resolved {
                outcome: PlacementOutcome::Failed
            })
        );
    }

    #[tokio::test]
    async fn test_second_claim_conflicts() {
        let (bbs, owner) = held_store().await;
        let req = request("my-guid");
        bbs.desire_placement(req.clone()).unwrap();

        bbs.claim_placement_request(&req, owner).await.unwrap();
        let err = bbs.claim_placement_request(&req, owner).await.unwrap_err();
        assert!(err.is_claim_conflict());
    }

    #[tokio::test]
    async fn test_claim_by_non_holder_rejected() {
        let (bbs, _owner) = held_store().await;
        let req = request("my-guid");
        bbs.desire_placement(req.clone()).unwrap();

        let err = bbs
            .claim_placement_request(&req, AuctioneerId::new())
            .await
            .unwrap_err();
        assert_eq!(err, BbsError::LockNotHeld(DEFAULT_CLAIM_LOCK.to_string()));
        assert!(!err.is_claim_conflict());
        assert_eq!(bbs.request_state(&req.process_guid), Some(RequestState::Pending));
    }

    #[tokio::test]
    async fn test_claim_checks_configured_lock() {
        let bbs = InMemoryBbs::new().with_claim_lock("placement");
        let owner = AuctioneerId::new();
        let _events = bbs.maintain_lock(DEFAULT_CLAIM_LOCK, owner).await.unwrap();
        let req = request("my-guid");
        bbs.desire_placement(req.clone()).unwrap();

        let err = bbs.claim_placement_request(&req, owner).await.unwrap_err();
        assert_eq!(err, BbsError::LockNotHeld("placement".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_requires_claim() {
        let bbs = InMemoryBbs::new();
        let req = request("my-guid");
        bbs.desire_placement(req.clone()).unwrap();

        let err = bbs
            .resolve_placement_request(&req, &PlacementOutcome::Failed)
            .await
            .unwrap_err();
        assert_eq!(err, BbsError::NotClaimed(req.process_guid.clone()));
    }

    #[tokio::test]
    async fn test_resolved_records_evicted_past_retention() {
        let (bbs, owner) = held_store().await;
        let bbs = bbs.with_resolved_retention(2);

        for guid in ["first", "second", "third"] {
            let req = request(guid);
            bbs.desire_placement(req.clone()).unwrap();
            bbs.claim_placement_request(&req, owner).await.unwrap();
            bbs.resolve_placement_request(&req, &PlacementOutcome::Failed)
                .await
                .unwrap();
        }

        assert_eq!(bbs.request_state(&"first".parse().unwrap()), None);
        assert!(bbs.request_state(&"second".parse().unwrap()).is_some());
        assert!(bbs.request_state(&"third".parse().unwrap()).is_some());
    }

    #[tokio::test]
    async fn test_desired_again_is_not_evicted_as_resolved() {
        let (bbs, owner) = held_store().await;
        let bbs = bbs.with_resolved_retention(1);

        let again = request("again");
        bbs.desire_placement(again.clone()).unwrap();
        bbs.claim_placement_request(&again, owner).await.unwrap();
        bbs.resolve_placement_request(&again, &PlacementOutcome::Failed)
            .await
            .unwrap();
        bbs.desire_placement(again.clone()).unwrap();

        let other = request("other");
        bbs.desire_placement(other.clone()).unwrap();
        bbs.claim_placement_request(&other, owner).await.unwrap();
        bbs.resolve_placement_request(&other, &PlacementOutcome::Failed)
            .await
            .unwrap();

        assert_eq!(bbs.request_state(&again.process_guid), Some(RequestState::Pending));
    }

    #[test]
    fn test_duplicate_desire_rejected() {
        let bbs = InMemoryBbs::new();
        bbs.desire_placement(request("my-guid")).unwrap();
        assert!(matches!(
            bbs.desire_placement(request("my-guid")),
            Err(BbsError::Duplicate(_))
        ));
    }
}
