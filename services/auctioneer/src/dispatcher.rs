//! Per-request auction dispatch.
//!
//! Given an admitted request and a held throttle slot: claim, filter reps by
//! stack, run the bidding engine (unless nobody qualifies) and resolve. A
//! successful claim is always followed by exactly one resolve. A failed
//! claim is never resolved.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use auctioneer_auction::{AuctionError, AuctionRunner};
use auctioneer_bbs::AuctioneerBbs;
use auctioneer_models::{
    AuctionRules, AuctionRunRequest, AuctioneerId, PlacementOutcome, PlacementRequest, Rep, RepId,
    Stack,
};
use futures_util::FutureExt;
use tracing::{debug, error, info, trace, warn};

use crate::admission::ThrottlePermit;
use crate::events;
use crate::status::AuctioneerStatus;

/// How a single dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Intake closed before a slot was free. Nothing was claimed.
    NotAdmitted,
    /// Another owner claimed first, or the claim failed.
    NotClaimed,
    /// Resolved with a winner.
    Placed(RepId),
    /// Resolved as failed without running the bidding engine.
    NoEligibleReps,
    /// Resolved as failed after the bidding engine (or rep listing) failed.
    AuctionFailed,
}

impl DispatchOutcome {
    fn resolution(&self) -> PlacementOutcome {
        match self {
            Self::Placed(winner) => PlacementOutcome::Placed {
                winner: winner.clone(),
            },
            _ => PlacementOutcome::Failed,
        }
    }
}

/// Ids of the reps whose stack matches exactly, in snapshot order.
pub fn eligible_rep_ids(reps: &[Rep], stack: &Stack) -> Vec<RepId> {
    reps.iter()
        .filter(|rep| rep.supports(stack))
        .map(|rep| rep.rep_id.clone())
        .collect()
}

pub struct AuctionDispatcher<B, R> {
    bbs: Arc<B>,
    runner: Arc<R>,
    owner: AuctioneerId,
    max_rounds: u32,
    auction_timeout: Duration,
    status: Arc<AuctioneerStatus>,
}

impl<B: AuctioneerBbs, R: AuctionRunner> AuctionDispatcher<B, R> {
    pub fn new(
        bbs: Arc<B>,
        runner: Arc<R>,
        owner: AuctioneerId,
        max_rounds: u32,
        auction_timeout: Duration,
        status: Arc<AuctioneerStatus>,
    ) -> Self {
        Self {
            bbs,
            runner,
            owner,
            max_rounds,
            auction_timeout,
            status,
        }
    }

    /// Claim, auction and resolve one request.
    ///
    /// `permit` is held until this returns.
    pub async fn dispatch(
        &self,
        request: PlacementRequest,
        permit: ThrottlePermit,
    ) -> DispatchOutcome {
        let _permit = permit;

        if let Err(e) = self
            .bbs
            .claim_placement_request(&request, self.owner)
            .await
        {
            if e.is_claim_conflict() {
                self.status.record_conflict();
                trace!(event = events::CLAIM_FAILED, error = %e, "Placement request claimed elsewhere");
            } else {
                warn!(event = events::CLAIM_FAILED, error = %e, "Failed to claim placement request");
            }
            return DispatchOutcome::NotClaimed;
        }

        self.status.record_claimed();
        debug!(stack = %request.stack, "Placement request claimed");

        let outcome = self.auction(&request).await;
        let resolution = outcome.resolution();

        if let Err(e) = self
            .bbs
            .resolve_placement_request(&request, &resolution)
            .await
        {
            error!(error = %e, "Failed to resolve placement request");
        }

        if resolution.is_placed() {
            self.status.record_placed();
        } else {
            self.status.record_failed();
        }

        outcome
    }

    async fn auction(&self, request: &PlacementRequest) -> DispatchOutcome {
        let reps = match self.bbs.list_reps().await {
            Ok(reps) => reps,
            Err(e) => {
                error!(event = events::AUCTION_FAILED, error = %e, "Failed to list reps");
                return DispatchOutcome::AuctionFailed;
            }
        };

        let rep_ids = eligible_rep_ids(&reps, &request.stack);
        if rep_ids.is_empty() {
            info!(
                event = events::NO_ELIGIBLE_REPS,
                stack = %request.stack,
                reps = reps.len(),
                "No reps support the requested stack"
            );
            return DispatchOutcome::NoEligibleReps;
        }

        let run_request = AuctionRunRequest {
            placement: request.clone(),
            rep_ids,
            rules: AuctionRules::reserve_n_best(self.max_rounds),
        };

        debug!(candidates = run_request.rep_ids.len(), "Running auction");

        let run = AssertUnwindSafe(self.runner.run_auction(run_request)).catch_unwind();

        let result = match tokio::time::timeout(self.auction_timeout, run).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AuctionError::Failed("auction runner panicked".to_string())),
            Err(_) => Err(AuctionError::TimedOut(request.process_guid.clone())),
        };

        match result {
            Ok(result) => {
                info!(
                    event = events::AUCTION_SUCCEEDED,
                    winner = %result.winner,
                    rounds = result.rounds,
                    "Auction succeeded"
                );
                DispatchOutcome::Placed(result.winner)
            }
            Err(e) => {
                error!(event = events::AUCTION_FAILED, error = %e, "Auction failed");
                DispatchOutcome::AuctionFailed
            }
        }
    }
}
