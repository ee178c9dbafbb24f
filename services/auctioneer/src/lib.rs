//! Auctioneer: the leader-elected placement coordinator.
//!
//! The lock holder watches the coordination store for placement requests,
//! claims them under a concurrency budget, runs an auction among the reps
//! whose stack matches, and always resolves what it claimed.
//!
//! ## Modules
//!
//! - `auctioneer`: the control loop
//! - `lifecycle`: lock acquisition and loss, readiness, release
//! - `watcher`: placement request subscription supervision
//! - `admission`: concurrency throttle and intake gating
//! - `dispatcher`: claim, auction, resolve for one request
//! - `status` / `api`: live status and health endpoints

pub mod admission;
pub mod api;
pub mod auctioneer;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod signals;
pub mod status;
pub mod watcher;

pub use auctioneer::Auctioneer;
pub use config::{AuctioneerConfig, Config, ConfigError};
pub use error::AuctioneerError;
pub use status::{AuctioneerStatus, LoopState, StatusSnapshot};
