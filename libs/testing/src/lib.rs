//! Test support for the auctioneer.
//!
//! - `FakeBbs`: a coordination store whose lock notifications, watch feed,
//!   claim results, and release acknowledgements are driven by the test
//! - `FakeAuctionRunner`: a bidding engine that records requests and can be
//!   made slow or failing
//! - `LogRecorder`: a tracing layer capturing events for assertions
//! - `eventually` / `consistently`: polling helpers for asynchronous state

mod fake_bbs;
mod fake_runner;
mod logs;
mod wait;

pub use fake_bbs::{FakeBbs, ReleaseRequest};
pub use fake_runner::FakeAuctionRunner;
pub use logs::{LogRecord, LogRecorder};
pub use wait::{consistently, eventually, eventually_within, CONSISTENTLY, EVENTUALLY};
