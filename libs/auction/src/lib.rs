//! Bidding engine interface and a local implementation.
//!
//! The auctioneer does not bid. It hands an `AuctionRunRequest` to an
//! `AuctionRunner`, which runs the multi-round bidding protocol against the
//! eligible reps and reports the winner.
//!
//! `LocalAuctionRunner` stands in for the real engine in development.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use auctioneer_models::{AuctionResult, AuctionRunRequest, ProcessGuid};
use thiserror::Error;
use tracing::{debug, info};

/// Errors reported by a bidding engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuctionError {
    /// No rep was offered to bid.
    #[error("no reps available to bid on {0}")]
    NoCandidates(ProcessGuid),

    /// Every round ended without a winning bid.
    #[error("auction for {process_guid} exhausted {rounds} rounds without a winner")]
    RoundsExhausted {
        process_guid: ProcessGuid,
        rounds: u32,
    },

    /// The auction did not finish in time.
    #[error("auction for {0} timed out")]
    TimedOut(ProcessGuid),

    /// The engine failed for another reason.
    #[error("auction failed: {0}")]
    Failed(String),
}

/// Bidding engine interface.
#[async_trait]
pub trait AuctionRunner: Send + Sync + 'static {
    /// Run one auction to completion.
    async fn run_auction(&self, request: AuctionRunRequest) -> Result<AuctionResult, AuctionError>;
}

/// Development runner.
///
/// Does not contact reps. Each auction takes a single round and the winner
/// rotates across the offered candidates, spreading placements evenly.
#[derive(Debug, Default)]
pub struct LocalAuctionRunner {
    auctions_run: AtomicU64,
}

impl LocalAuctionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of auctions this runner has completed.
    pub fn auctions_run(&self) -> u64 {
        self.auctions_run.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AuctionRunner for LocalAuctionRunner {
    async fn run_auction(&self, request: AuctionRunRequest) -> Result<AuctionResult, AuctionError> {
        let process_guid = request.placement.process_guid;

        if request.rep_ids.is_empty() {
            return Err(AuctionError::NoCandidates(process_guid));
        }

        if request.rules.max_rounds == 0 {
            return Err(AuctionError::RoundsExhausted {
                process_guid,
                rounds: 0,
            });
        }

        debug!(
            process_guid = %process_guid,
            candidates = request.rep_ids.len(),
            algorithm = %request.rules.algorithm,
            "[LOCAL] Running auction"
        );

        let n = self.auctions_run.fetch_add(1, Ordering::Relaxed);
        let winner = request.rep_ids[(n % request.rep_ids.len() as u64) as usize].clone();

        info!(
            process_guid = %process_guid,
            winner = %winner,
            "[LOCAL] Auction won"
        );

        Ok(AuctionResult { winner, rounds: 1 })
    }
}
