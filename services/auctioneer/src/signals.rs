//! OS signal handling.
//!
//! Handlers are installed up front so a failure to install them stops
//! startup instead of being mistaken for a shutdown request.

/// Installed SIGINT and SIGTERM handlers.
#[cfg(unix)]
pub struct ShutdownSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    /// Install the handlers. Must be called inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next shutdown signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Ctrl-C handler.
#[cfg(not(unix))]
pub struct ShutdownSignals(());

#[cfg(not(unix))]
impl ShutdownSignals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self(()))
    }

    /// Wait for Ctrl-C. If the handler cannot be registered this never
    /// resolves and the service keeps running.
    pub async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        "ctrl-c"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_install_inside_runtime() {
        let mut signals = ShutdownSignals::install().unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(50), signals.recv()).await;
        assert!(waited.is_err(), "no signal was sent, recv must stay pending");
    }
}
