//! System endpoints mounted at the root level (not under `/api/v1`).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::db::{PoolStats, PoolStatus};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `starting`, `healthy`, `degraded` or `closed`.
    pub status: String,
    /// Detailed pool readiness.
    pub database: PoolStatus,
    /// Pool occupancy.
    pub pool: PoolStats,
    /// Crate version.
    pub version: String,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// `GET /health` — Service and database readiness.
///
/// A degraded database still answers 200: the process keeps serving and
/// database-backed requests fail individually.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service readiness, database pool state and occupancy.",
    responses(
        (status = 200, description = "Service is up (database may be degraded)", body = HealthResponse),
        (status = 503, description = "Service is shutting down", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.database.status();
    let status = if database == PoolStatus::Closed {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(HealthResponse {
            status: database.label().to_string(),
            pool: state.database.stats(),
            database,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
