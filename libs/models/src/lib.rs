//! # auctioneer-models
//!
//! Value types shared by the auctioneer, its coordination store, and the
//! bidding engine.
//!
//! ## Keys
//!
//! Keys that originate outside the auctioneer (`ProcessGuid`, `RepId`,
//! `Stack`) are opaque, non-empty strings. The auctioneer's own identity
//! (`AuctioneerId`) is generated locally and uses the prefixed ULID format
//! `auc_{ulid}`.
//!
//! ## Lifecycle of a placement request
//!
//! A `PlacementRequest` is created by the fleet scheduler, observed by the
//! auctioneer through the store's watch feed, claimed by exactly one
//! auctioneer, and resolved with a `PlacementOutcome`.

mod auction;
mod error;
mod keys;
mod macros;
mod types;

pub use auction::*;
pub use error::KeyError;
pub use keys::*;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
