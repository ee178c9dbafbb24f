//! HTTP API handlers and routing.

mod health;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::status::AuctioneerStatus;

/// Create the router for health and status endpoints.
pub fn create_router(status: Arc<AuctioneerStatus>) -> Router {
    Router::new()
        .merge(health::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(status)
}
