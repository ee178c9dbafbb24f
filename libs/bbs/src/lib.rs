//! # auctioneer-bbs
//!
//! The coordination store ("BBS") as seen by the auctioneer.
//!
//! The store is the single source of truth across the fleet. It provides:
//! - leader election for the auctioneer lock
//! - a push feed of newly desired placement requests
//! - claim/resolve transitions for a single placement request
//! - the authoritative list of reps
//!
//! `AuctioneerBbs` is the contract the auctioneer consumes. `InMemoryBbs`
//! implements it for a single process and is used for development and tests.

mod error;
mod memory;
mod traits;
mod watch;

pub use error::BbsError;
pub use memory::{InMemoryBbs, RequestState, DEFAULT_CLAIM_LOCK, DEFAULT_RESOLVED_RETENTION};
pub use traits::{AuctioneerBbs, LockEvents};
pub use watch::{WatchEvent, WatchFeed, WatchSubscription};
