//! Admission control.
//!
//! `AuctionThrottle` bounds how many placement requests are claimed and not
//! yet resolved. A slot is taken before the claim and held until after the
//! resolve, so a saturated instance leaves unclaimed requests in the store
//! for other instances.
//!
//! An `IntakeGate` is open while this instance may admit new work. Each
//! arrival carries an `IntakeTicket`; waiting for a slot is abandoned once
//! the ticket's gate closes (lock lost or shutdown).

use std::sync::Arc;

use tokio::sync::{watch, AcquireError, OwnedSemaphorePermit, Semaphore};

/// Counting semaphore sized to the concurrency budget.
#[derive(Debug, Clone)]
pub struct AuctionThrottle {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held throttle slot. Dropping it returns the slot.
#[derive(Debug)]
pub struct ThrottlePermit {
    _permit: OwnedSemaphorePermit,
}

impl AuctionThrottle {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<ThrottlePermit, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        Ok(ThrottlePermit { _permit: permit })
    }

    /// Wait for a free slot unless the ticket's gate closes first.
    ///
    /// Returns `None` if intake closed before or while waiting.
    pub async fn admit(&self, ticket: &mut IntakeTicket) -> Option<ThrottlePermit> {
        let permit = tokio::select! {
            biased;
            _ = ticket.closed() => return None,
            permit = self.acquire() => permit.ok()?,
        };

        // The gate may have closed in the same instant the slot freed up.
        ticket.is_open().then_some(permit)
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity
            .saturating_sub(self.semaphore.available_permits())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Open while new arrivals may be admitted. Closes when dropped.
#[derive(Debug)]
pub struct IntakeGate {
    closed: watch::Sender<bool>,
}

impl IntakeGate {
    pub fn open() -> Self {
        let (closed, _) = watch::channel(false);
        Self { closed }
    }

    pub fn ticket(&self) -> IntakeTicket {
        IntakeTicket {
            closed: self.closed.subscribe(),
        }
    }
}

impl Drop for IntakeGate {
    fn drop(&mut self) {
        self.closed.send_replace(true);
    }
}

/// Observes one `IntakeGate`.
#[derive(Debug, Clone)]
pub struct IntakeTicket {
    closed: watch::Receiver<bool>,
}

impl IntakeTicket {
    /// A ticket whose gate is already closed.
    pub fn revoked() -> Self {
        let (_, closed) = watch::channel(true);
        Self { closed }
    }

    pub fn is_open(&self) -> bool {
        !*self.closed.borrow()
    }

    /// Resolves once the gate is closed.
    pub async fn closed(&mut self) {
        // An error means the gate is gone, which is also closed.
        let _ = self.closed.wait_for(|closed| *closed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_throttle_counts_in_flight() {
        let throttle = AuctionThrottle::new(2);
        let a = throttle.acquire().await.unwrap();
        let _b = throttle.acquire().await.unwrap();
        assert_eq!(throttle.in_flight(), 2);

        drop(a);
        assert_eq!(throttle.in_flight(), 1);
        assert_eq!(throttle.capacity(), 2);
    }

    #[tokio::test]
    async fn test_admit_waits_for_slot() {
        let throttle = AuctionThrottle::new(1);
        let gate = IntakeGate::open();
        let held = throttle.acquire().await.unwrap();

        let waiter = {
            let throttle = throttle.clone();
            let mut ticket = gate.ticket();
            tokio::spawn(async move { throttle.admit(&mut ticket).await.is_some() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_closing_gate_abandons_wait() {
        let throttle = AuctionThrottle::new(1);
        let gate = IntakeGate::open();
        let _held = throttle.acquire().await.unwrap();

        let waiter = {
            let throttle = throttle.clone();
            let mut ticket = gate.ticket();
            tokio::spawn(async move { throttle.admit(&mut ticket).await.is_some() })
        };

        drop(gate);
        assert!(!waiter.await.unwrap());
        assert_eq!(throttle.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_closed_ticket_never_admits() {
        let throttle = AuctionThrottle::new(1);
        let mut ticket = IntakeTicket::revoked();

        assert!(!ticket.is_open());
        assert!(throttle.admit(&mut ticket).await.is_none());
        assert_eq!(throttle.in_flight(), 0);
    }
}
