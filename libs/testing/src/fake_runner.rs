//! Scriptable bidding engine.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use auctioneer_auction::{AuctionError, AuctionRunner};
use auctioneer_models::{AuctionResult, AuctionRunRequest};

#[derive(Debug, Default)]
struct RunnerState {
    requests: Vec<AuctionRunRequest>,
    error: Option<AuctionError>,
    panic: bool,
}

/// Bidding engine fake.
///
/// Records every request when the call starts, waits `delay`, then either
/// fails with the configured error or declares the first candidate the
/// winner.
#[derive(Debug, Default)]
pub struct FakeAuctionRunner {
    delay: Duration,
    state: Mutex<RunnerState>,
}

impl FakeAuctionRunner {
    /// Create a runner that takes `delay` to finish each auction.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Mutex::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail every subsequent auction with `error`.
    pub fn set_error(&self, error: Option<AuctionError>) {
        self.state().error = error;
    }

    /// Panic inside every subsequent auction.
    pub fn set_panic(&self, panic: bool) {
        self.state().panic = panic;
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<AuctionRunRequest> {
        self.state().requests.clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<AuctionRunRequest> {
        self.state().requests.last().cloned()
    }

    /// Number of auctions started.
    pub fn run_count(&self) -> usize {
        self.state().requests.len()
    }
}

#[async_trait]
impl AuctionRunner for FakeAuctionRunner {
    async fn run_auction(&self, request: AuctionRunRequest) -> Result<AuctionResult, AuctionError> {
        let (error, panic) = {
            let mut state = self.state();
            state.requests.push(request.clone());
            (state.error.clone(), state.panic)
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if panic {
            panic!("fake auction runner panicked");
        }

        if let Some(error) = error {
            return Err(error);
        }

        let winner = request
            .rep_ids
            .first()
            .cloned()
            .ok_or_else(|| AuctionError::NoCandidates(request.placement.process_guid.clone()))?;

        Ok(AuctionResult { winner, rounds: 1 })
    }
}
