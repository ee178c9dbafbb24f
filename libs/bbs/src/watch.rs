//! Watch feed plumbing shared by store implementations.
//!
//! A feed is an unbounded channel. The store holds the `WatchFeed` end and
//! the auctioneer holds the `WatchSubscription` end:
//! - dropping the `WatchFeed` closes the subscription without error
//! - dropping (or stopping) the `WatchSubscription` tells the store to stop

use auctioneer_models::PlacementRequest;
use tokio::sync::mpsc;

use crate::BbsError;

/// One item delivered over a watch subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// A newly desired placement request.
    Request(PlacementRequest),
    /// The feed failed. No further items follow on this subscription.
    Error(BbsError),
}

/// Consumer end of a placement request feed.
#[derive(Debug)]
pub struct WatchSubscription {
    events: mpsc::UnboundedReceiver<WatchEvent>,
}

impl WatchSubscription {
    /// Create a connected feed/subscription pair.
    pub fn channel() -> (WatchFeed, WatchSubscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (WatchFeed { events: tx }, WatchSubscription { events: rx })
    }

    /// Receive the next item. `None` means the store closed the feed.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// Tear down the subscription.
    pub fn stop(mut self) {
        self.events.close();
    }
}

/// Producer end of a placement request feed.
#[derive(Debug, Clone)]
pub struct WatchFeed {
    events: mpsc::UnboundedSender<WatchEvent>,
}

impl WatchFeed {
    /// Deliver a request. Returns false if the subscriber has gone away.
    pub fn send_request(&self, request: PlacementRequest) -> bool {
        self.events.send(WatchEvent::Request(request)).is_ok()
    }

    /// Deliver an error. Returns false if the subscriber has gone away.
    pub fn send_error(&self, error: BbsError) -> bool {
        self.events.send(WatchEvent::Error(error)).is_ok()
    }

    /// Returns true once the subscriber stopped or dropped its end.
    pub fn is_stopped(&self) -> bool {
        self.events.is_closed()
    }

    /// Wait until the subscriber stops.
    pub async fn stopped(&self) {
        self.events.closed().await
    }
}
