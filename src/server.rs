//! Process assembly: probe the pool, compose routes, serve, shut down.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use crate::api;
use crate::app_state::AppState;
use crate::db::Database;
use crate::error::ServerError;

/// Serves the gateway on `listener` until `shutdown` resolves.
///
/// The database probe runs on its own task so the listener answers while
/// the database is still being reached, or is unreachable. After
/// `shutdown` resolves, in-flight requests are drained and then the pool
/// is closed.
///
/// # Errors
///
/// Returns a [`ServerError`] if the routes cannot be composed or the
/// listener fails.
pub async fn run<F>(
    listener: TcpListener,
    database: Arc<Database>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let _probe = database.spawn_health_check();

    let app = api::build_router(AppState::new(Arc::clone(&database)))?;

    let addr = listener.local_addr()?;
    tracing::info!(%addr, "server running on http://localhost:{}", addr.port());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    database.close().await;
    served?;
    tracing::info!("server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::warn!("received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            tracing::warn!("received SIGTERM, initiating graceful shutdown");
        }
    }
}
