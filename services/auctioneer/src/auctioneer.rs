//! The auctioneer control loop.
//!
//! One task multiplexes four sources with `tokio::select!`:
//! - the shutdown signal
//! - lock notifications, forwarded to `LockLifecycle`
//! - the placement request feed, owned by `WatchSupervisor`
//! - completions of per-request auction tasks
//!
//! Each arrival becomes its own task that waits for a throttle slot, then
//! claims, auctions and resolves. The loop itself never waits on the
//! throttle.

use std::sync::Arc;

use auctioneer_auction::AuctionRunner;
use auctioneer_bbs::AuctioneerBbs;
use auctioneer_models::{AuctioneerId, LockEvent, PlacementRequest};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, info_span, warn, Dispatch, Instrument};

use crate::admission::{AuctionThrottle, IntakeTicket};
use crate::config::AuctioneerConfig;
use crate::dispatcher::{AuctionDispatcher, DispatchOutcome};
use crate::error::AuctioneerError;
use crate::events;
use crate::lifecycle::LockLifecycle;
use crate::status::AuctioneerStatus;
use crate::watcher::{FeedEvent, WatchSupervisor};

pub struct Auctioneer<B, R> {
    id: AuctioneerId,
    bbs: Arc<B>,
    runner: Arc<R>,
    config: AuctioneerConfig,
    throttle: AuctionThrottle,
    status: Arc<AuctioneerStatus>,
    log_dispatch: Option<Dispatch>,
}

impl<B: AuctioneerBbs, R: AuctionRunner> Auctioneer<B, R> {
    pub fn new(
        bbs: Arc<B>,
        runner: Arc<R>,
        config: AuctioneerConfig,
    ) -> Result<Self, AuctioneerError> {
        config.validate()?;

        let throttle = AuctionThrottle::new(config.max_concurrent_auctions);
        let status = Arc::new(AuctioneerStatus::new(throttle.clone()));

        Ok(Self {
            id: AuctioneerId::new(),
            bbs,
            runner,
            config,
            throttle,
            status,
            log_dispatch: None,
        })
    }

    /// Send this instance's logs to `dispatch` instead of the global
    /// subscriber. Covers the loop and every auction task it spawns.
    pub fn with_log_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.log_dispatch = Some(dispatch);
        self
    }

    /// Owner identity used for the lock and for claims.
    pub fn id(&self) -> AuctioneerId {
        self.id
    }

    pub fn status(&self) -> Arc<AuctioneerStatus> {
        Arc::clone(&self.status)
    }

    /// Run until `shutdown` turns true (or its sender is dropped).
    ///
    /// `ready` fires once, on the first lock acquisition. Returns an error
    /// only if the lock could not be requested or released.
    pub async fn run(
        self,
        shutdown: watch::Receiver<bool>,
        ready: oneshot::Sender<()>,
    ) -> Result<(), AuctioneerError> {
        let dispatch = self.log_dispatch.clone();

        let run = async move {
            let span = info_span!("auctioneer", auctioneer_id = %self.id);
            self.run_loop(shutdown, ready).instrument(span).await
        };

        match dispatch {
            Some(dispatch) => run.with_subscriber(dispatch).await,
            None => run.await,
        }
    }

    async fn run_loop(
        self,
        mut shutdown: watch::Receiver<bool>,
        ready: oneshot::Sender<()>,
    ) -> Result<(), AuctioneerError> {
        let Self {
            id,
            bbs,
            runner,
            config,
            throttle,
            status,
            ..
        } = self;

        info!(
            lock = %config.lock_name,
            max_concurrent_auctions = config.max_concurrent_auctions,
            "Starting auctioneer"
        );

        let mut lock_events = bbs
            .maintain_lock(&config.lock_name, id)
            .await
            .map_err(AuctioneerError::AcquireLock)?;

        let dispatcher = Arc::new(AuctionDispatcher::new(
            Arc::clone(&bbs),
            runner,
            id,
            config.max_bidding_rounds,
            config.auction_timeout,
            Arc::clone(&status),
        ));
        let mut watcher = WatchSupervisor::new(Arc::clone(&bbs));
        let mut lifecycle = LockLifecycle::new(ready, Arc::clone(&status));
        let mut auctions: JoinSet<DispatchOutcome> = JoinSet::new();
        let mut lock_stream_open = true;

        while !*shutdown.borrow_and_update() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                event = lock_events.recv(), if lock_stream_open => match event {
                    Some(event) => lifecycle.on_lock_event(event, &mut watcher).await,
                    None => {
                        warn!("Lock notification stream ended");
                        lock_stream_open = false;
                        lifecycle.on_lock_event(LockEvent::Lost, &mut watcher).await;
                    }
                },

                event = watcher.next_event() => match event {
                    FeedEvent::Arrived(request, ticket) => {
                        spawn_auction(&mut auctions, &dispatcher, &throttle, request, ticket);
                    }
                    FeedEvent::Closed => {
                        warn!(
                            event = events::WATCH_CLOSED,
                            "Placement request watch closed, waiting for lock re-acquisition"
                        );
                        lifecycle.on_feed_dead();
                    }
                    FeedEvent::Errored(e) => {
                        warn!(
                            event = events::WATCH_ERRORED,
                            error = %e,
                            "Placement request watch failed, waiting for lock re-acquisition"
                        );
                        lifecycle.on_feed_dead();
                    }
                },

                Some(joined) = auctions.join_next(), if !auctions.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Auction task failed");
                    }
                }
            }
        }

        info!(in_flight = throttle.in_flight(), "Shutting down auctioneer");
        lifecycle.drain(&mut watcher);

        if !config.shutdown_grace.is_zero() && !auctions.is_empty() {
            let drained = tokio::time::timeout(config.shutdown_grace, async {
                while auctions.join_next().await.is_some() {}
            })
            .await;

            if drained.is_err() {
                warn!(
                    remaining = auctions.len(),
                    "Shutdown grace elapsed with auctions in flight"
                );
            }
        }

        // In-flight auctions keep running and resolve on their own.
        auctions.detach_all();

        lifecycle.release(bbs.as_ref(), &config.lock_name, id).await
    }
}

fn spawn_auction<B: AuctioneerBbs, R: AuctionRunner>(
    auctions: &mut JoinSet<DispatchOutcome>,
    dispatcher: &Arc<AuctionDispatcher<B, R>>,
    throttle: &AuctionThrottle,
    request: PlacementRequest,
    mut ticket: IntakeTicket,
) {
    let span = info_span!("run-auction", process_guid = %request.process_guid);
    let dispatcher = Arc::clone(dispatcher);
    let throttle = throttle.clone();

    auctions.spawn(
        async move {
            let Some(permit) = throttle.admit(&mut ticket).await else {
                debug!("Intake closed before a slot was free");
                return DispatchOutcome::NotAdmitted;
            };
            dispatcher.dispatch(request, permit).await
        }
        .instrument(span)
        .with_current_subscriber(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use auctioneer_bbs::BbsError;
    use auctioneer_testing::{FakeAuctionRunner, FakeBbs};
    use std::time::Duration;

    fn auctioneer(bbs: Arc<FakeBbs>) -> Auctioneer<FakeBbs, FakeAuctionRunner> {
        Auctioneer::new(
            bbs,
            Arc::new(FakeAuctionRunner::default()),
            AuctioneerConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AuctioneerConfig {
            max_concurrent_auctions: 0,
            ..AuctioneerConfig::default()
        };
        let result = Auctioneer::new(
            Arc::new(FakeBbs::new()),
            Arc::new(FakeAuctionRunner::default()),
            config,
        );
        assert!(matches!(result, Err(AuctioneerError::Config(_))));
    }

    #[tokio::test]
    async fn test_lock_request_failure_is_terminal() {
        let bbs = Arc::new(FakeBbs::new());
        bbs.set_maintain_error(Some(BbsError::Unavailable("down".into())));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();

        let result = auctioneer(bbs).run(shutdown_rx, ready_tx).await;

        assert!(matches!(result, Err(AuctioneerError::AcquireLock(_))));
        assert!(ready_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_before_start_still_releases() {
        let bbs = Arc::new(FakeBbs::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(true);
        let (ready_tx, _ready_rx) = oneshot::channel();
        let auctioneer = auctioneer(bbs.clone());
        let owner = auctioneer.id();

        let run = tokio::spawn(auctioneer.run(shutdown_rx, ready_tx));

        let release = bbs.next_release_request().await.unwrap();
        assert_eq!(release.owner, owner);
        assert_eq!(release.name, "auctioneer");
        release.ack();

        let result = tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(bbs.watch_count(), 0);
    }
}
