//! Shared, read-mostly view of a running auctioneer.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use serde::Serialize;

use crate::admission::AuctionThrottle;

/// Coarse state of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Lock not held, not watching.
    Idle,
    /// Lock held, consuming placement requests.
    Watching,
    /// Shutdown requested, releasing the lock.
    Draining,
    /// Terminal.
    Stopped,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Watching,
            2 => Self::Draining,
            3 => Self::Stopped,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Watching => 1,
            Self::Draining => 2,
            Self::Stopped => 3,
        }
    }
}

/// Live counters and flags, shared with the health endpoints.
#[derive(Debug)]
pub struct AuctioneerStatus {
    ready: AtomicBool,
    lock_held: AtomicBool,
    state: AtomicU8,
    claimed: AtomicU64,
    placed: AtomicU64,
    failed: AtomicU64,
    conflicts: AtomicU64,
    throttle: AuctionThrottle,
}

/// Point-in-time copy of `AuctioneerStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct StatusSnapshot {
    pub ready: bool,
    pub lock_held: bool,
    pub state: LoopState,
    pub in_flight: usize,
    pub capacity: usize,
    pub claimed: u64,
    pub placed: u64,
    pub failed: u64,
    pub conflicts: u64,
}

impl AuctioneerStatus {
    pub fn new(throttle: AuctionThrottle) -> Self {
        Self {
            ready: AtomicBool::new(false),
            lock_held: AtomicBool::new(false),
            state: AtomicU8::new(LoopState::Idle.as_u8()),
            claimed: AtomicU64::new(0),
            placed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
            throttle,
        }
    }

    /// True once the lock has been acquired at least once.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn lock_held(&self) -> bool {
        self.lock_held.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn in_flight(&self) -> usize {
        self.throttle.in_flight()
    }

    pub fn claimed(&self) -> u64 {
        self.claimed.load(Ordering::Relaxed)
    }

    pub fn placed(&self) -> u64 {
        self.placed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn conflicts(&self) -> u64 {
        self.conflicts.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub(crate) fn set_lock_held(&self, held: bool) {
        self.lock_held.store(held, Ordering::Release);
    }

    pub(crate) fn set_state(&self, state: LoopState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn record_claimed(&self) {
        self.claimed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_placed(&self) {
        self.placed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            ready: self.is_ready(),
            lock_held: self.lock_held(),
            state: self.state(),
            in_flight: self.in_flight(),
            capacity: self.throttle.capacity(),
            claimed: self.claimed(),
            placed: self.placed(),
            failed: self.failed(),
            conflicts: self.conflicts(),
        }
    }
}
