//! Auction inputs and outcomes.

use serde::{Deserialize, Serialize};

use crate::{PlacementRequest, RepId};

/// Name of the bidding algorithm the auctioneer requests.
pub const RESERVE_N_BEST: &str = "reserve_n_best";

/// Fraction of the eligible reps asked to bid in each round.
pub const DEFAULT_MAX_BIDDING_POOL: f64 = 0.2;

/// Rules handed to the bidding engine for a single auction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionRules {
    /// Bidding algorithm name.
    pub algorithm: String,

    /// Fraction (0.0, 1.0] of eligible reps sampled per round.
    pub max_bidding_pool: f64,

    /// Upper bound on bidding rounds before the auction gives up.
    pub max_rounds: u32,
}

impl AuctionRules {
    /// The rules every auctioneer-initiated auction runs with.
    pub fn reserve_n_best(max_rounds: u32) -> Self {
        Self {
            algorithm: RESERVE_N_BEST.to_string(),
            max_bidding_pool: DEFAULT_MAX_BIDDING_POOL,
            max_rounds,
        }
    }
}

/// One invocation of the bidding engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionRunRequest {
    /// The request being placed.
    pub placement: PlacementRequest,

    /// Reps allowed to bid. Never empty when built by the auctioneer.
    pub rep_ids: Vec<RepId>,

    /// Bidding rules.
    pub rules: AuctionRules,
}

/// Successful result of an auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionResult {
    /// Rep that won the auction and reserved capacity for the process.
    pub winner: RepId,

    /// Number of bidding rounds used.
    pub rounds: u32,
}

/// Terminal outcome written back when a placement request is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PlacementOutcome {
    /// The process was placed on `winner`.
    Placed { winner: RepId },

    /// No rep could be found; the fleet scheduler may retry later.
    Failed,
}

impl PlacementOutcome {
    pub fn winner(&self) -> Option<&RepId> {
        match self {
            Self::Placed { winner } => Some(winner),
            Self::Failed => None,
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_n_best_rules() {
        let rules = AuctionRules::reserve_n_best(10);
        assert_eq!(rules.algorithm, "reserve_n_best");
        assert_eq!(rules.max_bidding_pool, 0.2);
        assert_eq!(rules.max_rounds, 10);
    }

    #[test]
    fn test_outcome_serialization() {
        let placed = PlacementOutcome::Placed {
            winner: "first-rep".parse().unwrap(),
        };
        let json = serde_json::to_value(&placed).unwrap();
        assert_eq!(json["result"], "placed");
        assert_eq!(json["winner"], "first-rep");

        let failed = serde_json::to_value(PlacementOutcome::Failed).unwrap();
        assert_eq!(failed["result"], "failed");
    }

    #[test]
    fn test_outcome_winner() {
        let placed = PlacementOutcome::Placed {
            winner: "third-rep".parse().unwrap(),
        };
        assert_eq!(placed.winner().map(|r| r.as_str()), Some("third-rep"));
        assert!(placed.is_placed());
        assert!(PlacementOutcome::Failed.winner().is_none());
    }
}
