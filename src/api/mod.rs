//! HTTP surface: route composition, system endpoints and OpenAPI docs.
//!
//! Every [`Domain`] router is mounted under its own `/api/v1/<name>`
//! prefix through a [`RouteComposer`]; system endpoints sit at the root.

pub mod composer;
pub mod system;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::error::ComposeError;
use crate::modules::Domain;

pub use composer::{MountTable, RouteComposer};

/// OpenAPI document for the gateway.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "erp-gateway", description = "Versioned API host for the ERP domain modules"),
    paths(system::health_handler),
    components(schemas(
        system::HealthResponse,
        crate::db::PoolStatus,
        crate::db::PoolStats,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
        crate::modules::handlers::ModuleInfo,
        crate::modules::handlers::DbCheckResponse,
    )),
    tags((name = "System", description = "Health and readiness"))
)]
pub struct ApiDoc;

/// Mounts every domain module under its prefix.
///
/// # Errors
///
/// Returns a [`ComposeError`] if two modules claim the same prefix.
pub fn compose(state: &AppState) -> Result<MountTable, ComposeError> {
    let mut composer = RouteComposer::new();
    for domain in Domain::ALL {
        composer.mount(domain.prefix(), domain.routes().with_state::<()>(state.clone()))?;
    }
    tracing::info!(
        prefixes = ?composer.prefixes().collect::<Vec<_>>(),
        "domain routers mounted"
    );
    Ok(composer.build())
}

/// Builds the complete application router.
///
/// # Errors
///
/// Returns a [`ComposeError`] if the mount table cannot be assembled.
pub fn build_router(state: AppState) -> Result<Router, ComposeError> {
    let table = compose(&state)?;
    let router = table
        .into_router()
        .merge(system::routes().with_state::<()>(state));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    Ok(router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
