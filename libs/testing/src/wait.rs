//! Polling helpers for asserting on asynchronous state.

use std::time::Duration;

use tokio::time::Instant;

/// Default window for `eventually`.
pub const EVENTUALLY: Duration = Duration::from_secs(2);

/// Default window for `consistently`.
pub const CONSISTENTLY: Duration = Duration::from_millis(200);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `condition` until it holds, for up to `EVENTUALLY`.
pub async fn eventually<F>(condition: F) -> bool
where
    F: FnMut() -> bool,
{
    eventually_within(EVENTUALLY, condition).await
}

/// Poll `condition` until it holds, for up to `timeout`.
pub async fn eventually_within<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Check that `condition` holds on every poll for `duration`.
pub async fn consistently<F>(duration: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        if !condition() {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    condition()
}
