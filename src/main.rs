//! erp-gateway server entry point.
//!
//! Builds the shared database pool and serves the composed API until
//! Ctrl+C or SIGTERM.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use erp_gateway::config::{self, AppConfig};
use erp_gateway::db::PoolManager;
use erp_gateway::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may carry LOG_FORMAT and RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize tracing before config so invalid settings are reported
    let log_json = config::is_json_log_format(std::env::var("LOG_FORMAT").ok().as_deref());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = AppConfig::from_env()?;

    tracing::info!(addr = %config.listen_addr, "starting erp-gateway");

    // Build the process-wide pool; no I/O until the probe runs
    let database = Arc::new(PoolManager::initialize(&config.database));

    // Start server
    let listener = TcpListener::bind(config.listen_addr).await?;
    server::run(listener, database, server::shutdown_signal()).await?;

    Ok(())
}
