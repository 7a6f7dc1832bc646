//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (warehouse answers the catalog query)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 200 once the country catalog can be loaded. After the first
/// success this is served from the memo cache.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    match check_warehouse_health(&state).await {
        true => StatusCode::OK,
        false => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let warehouse_ok = check_warehouse_health(&state).await;

    Json(HealthResponse {
        status: if warehouse_ok { "healthy" } else { "unhealthy" }.to_string(),
        backend: state.dashboard.backend().to_string(),
        warehouse: if warehouse_ok { "ok" } else { "error" }.to_string(),
        cache: state.dashboard.cache_stats().await.into(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn check_warehouse_health(state: &AppState) -> bool {
    match state.dashboard.countries().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Warehouse health check failed");
            false
        }
    }
}
