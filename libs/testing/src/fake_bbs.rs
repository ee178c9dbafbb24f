//! Scriptable coordination store.
//!
//! Every interaction the auctioneer has with the store is either recorded
//! (claims, resolves, subscriptions) or driven by the test (lock
//! notifications, watch arrivals, failures, release acknowledgements).

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use auctioneer_bbs::{AuctioneerBbs, BbsError, LockEvents, WatchFeed, WatchSubscription};
use auctioneer_models::{AuctioneerId, LockEvent, PlacementOutcome, PlacementRequest, Rep};
use tokio::sync::{mpsc, oneshot};

/// A pending `release_lock` call waiting for the test to answer.
#[derive(Debug)]
pub struct ReleaseRequest {
    pub name: String,
    pub owner: AuctioneerId,
    reply: oneshot::Sender<Result<(), BbsError>>,
}

impl ReleaseRequest {
    /// Acknowledge the release.
    pub fn ack(self) {
        let _ = self.reply.send(Ok(()));
    }

    /// Reject the release with `error`.
    pub fn fail(self, error: BbsError) {
        let _ = self.reply.send(Err(error));
    }
}

#[derive(Debug, Default)]
struct FakeState {
    reps: Vec<Rep>,
    lock_events: Option<LockEvents>,
    lock_requests: Vec<(String, AuctioneerId)>,
    maintain_error: Option<BbsError>,
    subscribe_error: Option<BbsError>,
    claim_error: Option<BbsError>,
    list_error: Option<BbsError>,
    resolve_error: Option<BbsError>,
    claim_attempts: Vec<PlacementRequest>,
    claimed: Vec<PlacementRequest>,
    resolved: Vec<(PlacementRequest, PlacementOutcome)>,
    feeds: Vec<WatchFeed>,
    subscriptions: usize,
}

/// Coordination store fake.
#[derive(Debug)]
pub struct FakeBbs {
    state: Mutex<FakeState>,
    lock_tx: Mutex<Option<mpsc::UnboundedSender<LockEvent>>>,
    release_tx: mpsc::UnboundedSender<ReleaseRequest>,
    release_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ReleaseRequest>>,
}

impl Default for FakeBbs {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBbs {
    pub fn new() -> Self {
        let (lock_tx, lock_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::unbounded_channel();

        Self {
            state: Mutex::new(FakeState {
                lock_events: Some(lock_rx),
                ..FakeState::default()
            }),
            lock_tx: Mutex::new(Some(lock_tx)),
            release_tx,
            release_rx: tokio::sync::Mutex::new(release_rx),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Lock

    /// Deliver a lock notification to the maintainer.
    pub fn send_lock(&self, event: LockEvent) {
        let guard = self.lock_tx.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(event);
        }
    }

    /// End the lock notification stream.
    pub fn end_lock_stream(&self) {
        self.lock_tx.lock().unwrap_or_else(|p| p.into_inner()).take();
    }

    /// Make `maintain_lock` fail.
    pub fn set_maintain_error(&self, error: Option<BbsError>) {
        self.state().maintain_error = error;
    }

    /// `(name, owner)` of every `maintain_lock` call.
    pub fn lock_requests(&self) -> Vec<(String, AuctioneerId)> {
        self.state().lock_requests.clone()
    }

    /// Wait for the next `release_lock` call.
    pub async fn next_release_request(&self) -> Option<ReleaseRequest> {
        self.release_rx.lock().await.recv().await
    }

    // Watch

    /// Push a request to the most recent open subscription.
    ///
    /// Returns false if nobody is subscribed.
    pub fn push_request(&self, request: PlacementRequest) -> bool {
        let mut state = self.state();
        state.feeds.retain(|feed| !feed.is_stopped());
        state
            .feeds
            .last()
            .is_some_and(|feed| feed.send_request(request))
    }

    /// Close every open subscription without error.
    pub fn close_watch(&self) {
        self.state().feeds.clear();
    }

    /// Fail every open subscription with `error` and close it.
    pub fn fail_watch(&self, error: BbsError) {
        let feeds = std::mem::take(&mut self.state().feeds);
        for feed in feeds {
            feed.send_error(error.clone());
        }
    }

    /// Make subsequent `watch_placement_requests` calls fail.
    pub fn set_subscribe_error(&self, error: Option<BbsError>) {
        self.state().subscribe_error = error;
    }

    /// Number of successful `watch_placement_requests` calls.
    pub fn watch_count(&self) -> usize {
        self.state().subscriptions
    }

    /// Returns true while a subscription is open and not stopped.
    pub fn is_watching(&self) -> bool {
        let mut state = self.state();
        state.feeds.retain(|feed| !feed.is_stopped());
        !state.feeds.is_empty()
    }

    // Requests

    pub fn set_reps(&self, reps: Vec<Rep>) {
        self.state().reps = reps;
    }

    pub fn set_claim_error(&self, error: Option<BbsError>) {
        self.state().claim_error = error;
    }

    pub fn set_list_error(&self, error: Option<BbsError>) {
        self.state().list_error = error;
    }

    pub fn set_resolve_error(&self, error: Option<BbsError>) {
        self.state().resolve_error = error;
    }

    /// Every claim attempt, successful or not.
    pub fn claim_attempts(&self) -> Vec<PlacementRequest> {
        self.state().claim_attempts.clone()
    }

    /// Successful claims.
    pub fn claimed(&self) -> Vec<PlacementRequest> {
        self.state().claimed.clone()
    }

    pub fn claimed_count(&self) -> usize {
        self.state().claimed.len()
    }

    /// Resolve calls, successful or not.
    pub fn resolved(&self) -> Vec<(PlacementRequest, PlacementOutcome)> {
        self.state().resolved.clone()
    }

    pub fn resolved_count(&self) -> usize {
        self.state().resolved.len()
    }
}

#[async_trait]
impl AuctioneerBbs for FakeBbs {
    async fn maintain_lock(&self, name: &str, owner: AuctioneerId) -> Result<LockEvents, BbsError> {
        let mut state = self.state();
        state.lock_requests.push((name.to_string(), owner));

        if let Some(error) = state.maintain_error.clone() {
            return Err(error);
        }

        state
            .lock_events
            .take()
            .ok_or_else(|| BbsError::Unavailable("lock is already maintained".to_string()))
    }

    async fn release_lock(&self, name: &str, owner: AuctioneerId) -> Result<(), BbsError> {
        let (reply, ack) = oneshot::channel();
        let request = ReleaseRequest {
            name: name.to_string(),
            owner,
            reply,
        };

        self.release_tx
            .send(request)
            .map_err(|_| BbsError::Unavailable("release channel closed".to_string()))?;

        ack.await
            .map_err(|_| BbsError::Unavailable("release abandoned".to_string()))?
    }

    async fn watch_placement_requests(&self) -> Result<WatchSubscription, BbsError> {
        let mut state = self.state();
        if let Some(error) = state.subscribe_error.clone() {
            return Err(error);
        }

        let (feed, subscription) = WatchSubscription::channel();
        state.feeds.push(feed);
        state.subscriptions += 1;
        Ok(subscription)
    }

    async fn claim_placement_request(
        &self,
        request: &PlacementRequest,
        _owner: AuctioneerId,
    ) -> Result<(), BbsError> {
        let mut state = self.state();
        state.claim_attempts.push(request.clone());

        if let Some(error) = state.claim_error.clone() {
            return Err(error);
        }

        state.claimed.push(request.clone());
        Ok(())
    }

    async fn resolve_placement_request(
        &self,
        request: &PlacementRequest,
        outcome: &PlacementOutcome,
    ) -> Result<(), BbsError> {
        let mut state = self.state();
        state.resolved.push((request.clone(), outcome.clone()));

        match state.resolve_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn list_reps(&self) -> Result<Vec<Rep>, BbsError> {
        let state = self.state();
        match state.list_error.clone() {
            Some(error) => Err(error),
            None => Ok(state.reps.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auctioneer_bbs::WatchEvent;

    fn request(guid: &str) -> PlacementRequest {
        PlacementRequest::new(guid.parse().unwrap(), "lucid64".parse().unwrap())
    }

    #[tokio::test]
    async fn test_release_waits_for_ack() {
        let bbs = std::sync::Arc::new(FakeBbs::new());
        let owner = AuctioneerId::new();

        let releasing = {
            let bbs = bbs.clone();
            tokio::spawn(async move { bbs.release_lock("auctioneer", owner).await })
        };

        let pending = bbs.next_release_request().await.unwrap();
        assert_eq!(pending.name, "auctioneer");
        assert_eq!(pending.owner, owner);
        assert!(!releasing.is_finished());

        pending.ack();
        assert_eq!(releasing.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_lock_stream_taken_once() {
        let bbs = FakeBbs::new();
        let owner = AuctioneerId::new();

        let mut events = bbs.maintain_lock("auctioneer", owner).await.unwrap();
        bbs.send_lock(LockEvent::Acquired);
        assert_eq!(events.recv().await, Some(LockEvent::Acquired));

        assert!(bbs.maintain_lock("auctioneer", owner).await.is_err());
        assert_eq!(bbs.lock_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_push_reaches_latest_subscription() {
        let bbs = FakeBbs::new();
        let first = bbs.watch_placement_requests().await.unwrap();
        let mut second = bbs.watch_placement_requests().await.unwrap();
        first.stop();

        assert!(bbs.push_request(request("a")));
        assert_eq!(second.recv().await, Some(WatchEvent::Request(request("a"))));
        assert_eq!(bbs.watch_count(), 2);

        bbs.close_watch();
        assert!(!bbs.is_watching());
        assert_eq!(second.recv().await, None);
        assert!(!bbs.push_request(request("b")));
    }

    #[tokio::test]
    async fn test_claim_error_is_recorded_as_attempt_only() {
        let bbs = FakeBbs::new();
        bbs.set_claim_error(Some(BbsError::AlreadyClaimed("a".parse().unwrap())));

        let result = bbs
            .claim_placement_request(&request("a"), AuctioneerId::new())
            .await;

        assert!(result.unwrap_err().is_claim_conflict());
        assert_eq!(bbs.claim_attempts().len(), 1);
        assert_eq!(bbs.claimed_count(), 0);
    }
}
