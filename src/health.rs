// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Health probe and metrics HTTP server.
//!
//! | Path | Response |
//! |---|---|
//! | `/healthz` | always `200 ok` while the process runs |
//! | `/readyz` | `200` if Pi-hole answers a health check in time, else `503` |
//! | `/metrics` | Prometheus text format |

use crate::constants::{METRICS_SERVER_PATH, READINESS_TIMEOUT_SECS};
use crate::metrics::gather_metrics;
use crate::pihole::DnsStore;
use anyhow::{Context as _, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// State shared by the probe handlers.
#[derive(Clone)]
pub struct HealthState {
    pub pihole: Arc<dyn DnsStore>,
    pub readiness_timeout: Duration,
}

impl HealthState {
    #[must_use]
    pub fn new(pihole: Arc<dyn DnsStore>) -> Self {
        Self {
            pihole,
            readiness_timeout: Duration::from_secs(READINESS_TIMEOUT_SECS),
        }
    }
}

/// Router with the probe and metrics endpoints.
pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(METRICS_SERVER_PATH, get(metrics))
        .with_state(state)
}

/// Serve the probe endpoints on `addr` until the process exits.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_health_server(addr: SocketAddr, state: HealthState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind health server to {addr}"))?;
    info!(address = %addr, "Health server listening");

    axum::serve(listener, router(state))
        .await
        .context("health server failed")
}

pub(crate) async fn healthz() -> &'static str {
    "ok"
}

pub(crate) async fn readyz(State(state): State<HealthState>) -> (StatusCode, &'static str) {
    match tokio::time::timeout(state.readiness_timeout, state.pihole.healthy()).await {
        Ok(true) => (StatusCode::OK, "ok"),
        Ok(false) => {
            debug!("Readiness check failed: Pi-hole unhealthy");
            (StatusCode::SERVICE_UNAVAILABLE, "pihole unhealthy")
        }
        Err(_) => {
            debug!("Readiness check failed: Pi-hole health check timed out");
            (StatusCode::SERVICE_UNAVAILABLE, "pihole health check timed out")
        }
    }
}

pub(crate) async fn metrics() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod health_tests;
