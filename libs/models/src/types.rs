//! Fleet and request records as seen by the auctioneer.

use serde::{Deserialize, Serialize};

use crate::{ProcessGuid, RepId, Stack};

/// Presence record of a rep currently registered with the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rep {
    /// Unique identity of the rep.
    pub rep_id: RepId,

    /// Capability tag advertised by the rep.
    pub stack: Stack,
}

impl Rep {
    pub fn new(rep_id: RepId, stack: Stack) -> Self {
        Self { rep_id, stack }
    }

    /// Returns true if this rep may bid on work requiring `stack`.
    pub fn supports(&self, stack: &Stack) -> bool {
        &self.stack == stack
    }
}

/// A pending request to start a process somewhere in the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementRequest {
    /// Unique key of the desired process.
    pub process_guid: ProcessGuid,

    /// Capability the winning rep must provide.
    pub stack: Stack,
}

impl PlacementRequest {
    pub fn new(process_guid: ProcessGuid, stack: Stack) -> Self {
        Self {
            process_guid,
            stack,
        }
    }
}

/// Leader-election notification for the auctioneer lock.
///
/// A tagged event instead of a bare boolean so "no notification yet" and
/// "lock not held" can never be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockEvent {
    /// This instance now holds the lock.
    Acquired,
    /// This instance does not hold the lock (never had it, or lost it).
    Lost,
}

impl LockEvent {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }
}

impl From<bool> for LockEvent {
    fn from(acquired: bool) -> Self {
        if acquired {
            Self::Acquired
        } else {
            Self::Lost
        }
    }
}
