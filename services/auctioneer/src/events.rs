//! Values of the `event` field on named log events.

pub const AUCTION_FAILED: &str = "auction-failed";
pub const AUCTION_SUCCEEDED: &str = "auction-succeeded";
pub const NO_ELIGIBLE_REPS: &str = "no-eligible-reps";
pub const CLAIM_FAILED: &str = "claim-failed";
pub const WATCH_CLOSED: &str = "watch-closed";
pub const WATCH_ERRORED: &str = "watch-errored";
