//! Leader lock lifecycle.
//!
//! Translates lock notifications into watch start/stop transitions and
//! reports readiness once, on the first acquisition.

use std::sync::Arc;

use auctioneer_bbs::AuctioneerBbs;
use auctioneer_models::{AuctioneerId, LockEvent};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::AuctioneerError;
use crate::events;
use crate::status::{AuctioneerStatus, LoopState};
use crate::watcher::WatchSupervisor;

pub struct LockLifecycle {
    ready: Option<oneshot::Sender<()>>,
    status: Arc<AuctioneerStatus>,
}

impl LockLifecycle {
    pub fn new(ready: oneshot::Sender<()>, status: Arc<AuctioneerStatus>) -> Self {
        Self {
            ready: Some(ready),
            status,
        }
    }

    pub async fn on_lock_event<B: AuctioneerBbs>(
        &mut self,
        event: LockEvent,
        watch: &mut WatchSupervisor<B>,
    ) {
        match event {
            LockEvent::Acquired => {
                self.status.set_lock_held(true);

                if let Some(ready) = self.ready.take() {
                    self.status.mark_ready();
                    let _ = ready.send(());
                    info!("Auctioneer ready");
                }

                if watch.is_watching() {
                    debug!("Lock still held, keeping the live placement request watch");
                    return;
                }

                match watch.start().await {
                    Ok(()) => {
                        self.status.set_state(LoopState::Watching);
                        info!("Lock acquired, watching for placement requests");
                    }
                    Err(e) => {
                        self.status.set_state(LoopState::Idle);
                        warn!(
                            event = events::WATCH_ERRORED,
                            error = %e,
                            "Failed to watch placement requests"
                        );
                    }
                }
            }
            LockEvent::Lost => {
                self.status.set_lock_held(false);
                self.status.set_state(LoopState::Idle);
                if watch.stop() {
                    info!("Lock lost, stopped watching for placement requests");
                } else {
                    info!("Lock not held");
                }
            }
        }
    }

    /// The feed died. Intake stays idle until the lock is re-acquired.
    pub fn on_feed_dead(&mut self) {
        self.status.set_state(LoopState::Idle);
    }

    /// Stop consuming new requests ahead of releasing the lock.
    pub fn drain<B: AuctioneerBbs>(&mut self, watch: &mut WatchSupervisor<B>) {
        self.status.set_state(LoopState::Draining);
        watch.stop();
    }

    /// Release the lock and wait for the store to acknowledge it.
    pub async fn release<B: AuctioneerBbs>(
        &mut self,
        bbs: &B,
        lock_name: &str,
        owner: AuctioneerId,
    ) -> Result<(), AuctioneerError> {
        let result = bbs
            .release_lock(lock_name, owner)
            .await
            .map_err(AuctioneerError::ReleaseLock);

        self.status.set_lock_held(false);
        self.status.set_state(LoopState::Stopped);

        match &result {
            Ok(()) => info!(lock = %lock_name, "Lock released"),
            Err(e) => warn!(lock = %lock_name, error = %e, "Failed to release lock"),
        }

        result
    }
}
