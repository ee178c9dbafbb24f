//! Health check endpoints.
//!
//! `/readyz` reports 503 until this instance has held the auctioneer lock at
//! least once.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::status::{AuctioneerStatus, StatusSnapshot};

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// "ok" or "waiting".
    pub status: String,
    pub service: String,
    pub version: String,
    /// Current timestamp (RFC 3339).
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auctioneer: Option<StatusSnapshot>,
}

pub fn routes() -> Router<Arc<AuctioneerStatus>> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/livez", get(livez))
        .route("/v1/status", get(status))
}

fn response(status: &str, auctioneer: Option<StatusSnapshot>) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        service: "auctioneer".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        auctioneer,
    }
}

async fn healthz() -> impl IntoResponse {
    Json(response("ok", None))
}

async fn readyz(State(status): State<Arc<AuctioneerStatus>>) -> impl IntoResponse {
    let snapshot = status.snapshot();
    if snapshot.ready {
        (StatusCode::OK, Json(response("ok", Some(snapshot))))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(response("waiting", Some(snapshot))),
        )
    }
}

async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

async fn status(State(status): State<Arc<AuctioneerStatus>>) -> Json<StatusSnapshot> {
    Json(status.snapshot())
}
