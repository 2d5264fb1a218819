//! Handlers shared by every domain module.

use std::time::Instant;

use axum::Json;
use axum::extract::{OriginalUri, State};
use serde::Serialize;
use utoipa::ToSchema;

use super::Domain;
use crate::app_state::AppState;
use crate::error::ApiError;

/// Module descriptor returned from a module root.
#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleInfo {
    /// Module name.
    pub module: &'static str,
    /// Mount prefix.
    pub prefix: &'static str,
    /// API version.
    pub version: &'static str,
}

/// `GET {prefix}/` — Describes the module.
pub async fn module_info(domain: Domain) -> Json<ModuleInfo> {
    Json(ModuleInfo {
        module: domain.name(),
        prefix: domain.prefix(),
        version: "v1",
    })
}

/// Fallback for paths under a module prefix that no module route matches.
///
/// Reports the full request path, not the prefix-relative one the module
/// router sees.
pub async fn route_not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}

/// Result of a database round-trip.
#[derive(Debug, Serialize, ToSchema)]
pub struct DbCheckResponse {
    /// Always `"ok"`; failures are reported as errors.
    pub status: &'static str,
    /// Round-trip time including connection checkout.
    pub latency_ms: u64,
}

/// `GET {prefix}/db-check` — Checks out a pooled connection and pings the
/// database.
///
/// # Errors
///
/// - [`ApiError::PoolExhausted`] / [`ApiError::PoolClosed`] when no
///   connection can be checked out.
/// - [`ApiError::Database`] when connecting or pinging fails.
pub async fn db_check(State(state): State<AppState>) -> Result<Json<DbCheckResponse>, ApiError> {
    let started = Instant::now();
    let mut conn = state.database.acquire().await?;

    if let Err(err) = conn.ping().await {
        conn.discard().await;
        return Err(err.into());
    }
    conn.release();

    Ok(Json(DbCheckResponse {
        status: "ok",
        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }))
}
