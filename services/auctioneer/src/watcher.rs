//! Placement request watch supervision.
//!
//! Owns at most one store subscription. A feed that closes or errors is not
//! re-opened here; the next `start()` (driven by lock acquisition) opens a
//! fresh one.

use std::sync::Arc;

use auctioneer_bbs::{AuctioneerBbs, BbsError, WatchEvent, WatchSubscription};
use auctioneer_models::PlacementRequest;
use tracing::debug;

use crate::admission::{IntakeGate, IntakeTicket};

/// What the current subscription produced.
#[derive(Debug)]
pub enum FeedEvent {
    /// A new request, with a ticket tied to the intake gate it arrived under.
    Arrived(PlacementRequest, IntakeTicket),
    /// The store closed the feed without error.
    Closed,
    /// The feed failed.
    Errored(BbsError),
}

pub struct WatchSupervisor<B> {
    bbs: Arc<B>,
    subscription: Option<WatchSubscription>,
    gate: Option<IntakeGate>,
}

impl<B: AuctioneerBbs> WatchSupervisor<B> {
    pub fn new(bbs: Arc<B>) -> Self {
        Self {
            bbs,
            subscription: None,
            gate: None,
        }
    }

    /// Open a subscription unless one is already live.
    ///
    /// A live subscription is kept as is: replacing it would drop arrivals
    /// still buffered in it. The intake gate stays open across restarts so
    /// admissions already waiting for a slot are not abandoned.
    pub async fn start(&mut self) -> Result<(), BbsError> {
        if self.subscription.is_none() {
            self.subscription = Some(self.bbs.watch_placement_requests().await?);
        } else {
            debug!("Placement request subscription already live");
        }

        if self.gate.is_none() {
            self.gate = Some(IntakeGate::open());
        }

        Ok(())
    }

    /// Tear down the subscription and close intake.
    ///
    /// Returns true if a subscription was open.
    pub fn stop(&mut self) -> bool {
        self.gate = None;
        match self.subscription.take() {
            Some(subscription) => {
                subscription.stop();
                true
            }
            None => false,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    /// Wait for the next feed event. Never resolves while not watching.
    ///
    /// Cancel safe.
    pub async fn next_event(&mut self) -> FeedEvent {
        let Some(subscription) = self.subscription.as_mut() else {
            return std::future::pending().await;
        };

        match subscription.recv().await {
            Some(WatchEvent::Request(request)) => {
                let ticket = self
                    .gate
                    .as_ref()
                    .map_or_else(IntakeTicket::revoked, IntakeGate::ticket);
                FeedEvent::Arrived(request, ticket)
            }
            Some(WatchEvent::Error(error)) => {
                self.subscription = None;
                FeedEvent::Errored(error)
            }
            None => {
                self.subscription = None;
                FeedEvent::Closed
            }
        }
    }
}
