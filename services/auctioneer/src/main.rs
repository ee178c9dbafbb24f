//! Auctioneer service.
//!
//! Runs the placement coordinator against the in-memory coordination store
//! and the local auction runner, and serves health endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use auctioneer::{api, signals, Auctioneer, Config};
use auctioneer_auction::LocalAuctionRunner;
use auctioneer_bbs::InMemoryBbs;
use tokio::sync::{oneshot, watch};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to AUCTIONEER_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting auctioneer");
    info!(
        listen_addr = %config.listen_addr,
        max_concurrent_auctions = config.auctioneer.max_concurrent_auctions,
        max_bidding_rounds = config.auctioneer.max_bidding_rounds,
        "Configuration loaded"
    );

    let bbs = Arc::new(InMemoryBbs::new().with_claim_lock(config.auctioneer.lock_name.clone()));
    for rep in &config.dev_reps {
        bbs.register_rep(rep.clone());
    }
    info!(reps = config.dev_reps.len(), "In-memory store seeded");

    // Fail startup rather than run without a way to be stopped cleanly
    let mut signals = signals::ShutdownSignals::install()?;

    let auctioneer = Auctioneer::new(bbs, Arc::new(LocalAuctionRunner::new()), config.auctioneer)?;
    let status = auctioneer.status();

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (ready_tx, ready_rx) = oneshot::channel();

    let mut auctioneer_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move { auctioneer.run(shutdown_rx, ready_tx).await }
    });

    tokio::spawn(async move {
        if ready_rx.await.is_ok() {
            info!("Auctioneer holds the lock");
        }
    });

    // Build and run the server
    let app = api::create_router(status);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    // Spawn the server with graceful shutdown
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
                info!("HTTP server shutting down");
            })
            .await
    });

    // Wait for a shutdown signal, or for the auctioneer to stop on its own
    let finished = tokio::select! {
        signal = signals.recv() => {
            info!(signal, "Received shutdown signal");
            None
        }
        joined = &mut auctioneer_handle => Some(joined),
    };

    // Signal shutdown to the auctioneer and the server
    let _ = shutdown_tx.send(true);

    // The lock must be released before the process exits.
    let joined = match finished {
        Some(joined) => joined,
        None => auctioneer_handle.await,
    };

    let result = match joined {
        Ok(Ok(())) => {
            info!("Auctioneer stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Auctioneer failed");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "Auctioneer task panicked");
            Err(e.into())
        }
    };

    let shutdown_timeout = Duration::from_secs(10);
    if tokio::time::timeout(shutdown_timeout, server_handle).await.is_err() {
        warn!("HTTP server did not shut down in time");
    }

    info!("Auctioneer shutdown complete");
    result
}
