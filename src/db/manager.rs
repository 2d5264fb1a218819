//! Lifecycle owner of the process-wide connection pool.
//!
//! [`PoolManager`] is built once in `main` and shared as an `Arc` through
//! [`AppState`](crate::app_state::AppState). It never blocks startup: the
//! readiness probe runs on its own task and a failed probe leaves the
//! process serving in [`PoolStatus::Degraded`].
//!
//! ```text
//! Uninitialized ──health_check──▶ Initializing ──▶ Healthy
//!                                              └─▶ Degraded ──acquire ok──▶ Healthy
//!        any state ──close──▶ Closed
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use super::{ConnectionPool, Connector, MySqlConnector, PoolOptions, PoolStats, PooledConnection};
use crate::config::DatabaseConfig;
use crate::error::PoolError;

/// Readiness of the shared pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PoolStatus {
    /// Built, not yet probed.
    Uninitialized,
    /// Startup probe in flight.
    Initializing,
    /// The database answered.
    Healthy,
    /// The startup probe failed; requests are still served and database
    /// calls fail individually.
    Degraded {
        /// Error reported by the failed probe.
        reason: String,
    },
    /// The pool has been shut down.
    Closed,
}

impl PoolStatus {
    /// Returns `true` once the startup probe has completed, whatever its
    /// outcome.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded { .. })
    }

    /// Short label used in health responses.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Uninitialized | Self::Initializing => "starting",
            Self::Healthy => "healthy",
            Self::Degraded { .. } => "degraded",
            Self::Closed => "closed",
        }
    }
}

/// Owns the shared [`ConnectionPool`] and tracks its readiness.
pub struct PoolManager<C: Connector = MySqlConnector> {
    pool: ConnectionPool<C>,
    status: watch::Sender<PoolStatus>,
}

impl PoolManager<MySqlConnector> {
    /// Builds the MySQL pool from configuration. Performs no network I/O.
    #[must_use]
    pub fn initialize(config: &DatabaseConfig) -> Self {
        let connector = MySqlConnector::new(config);
        tracing::info!(
            endpoint = connector.endpoint(),
            max_connections = config.max_connections,
            queue_limit = config.queue_limit,
            "database pool created"
        );
        Self::new(connector, PoolOptions::from(config))
    }
}

impl<C: Connector> PoolManager<C> {
    /// Wraps a new pool over `connector`.
    #[must_use]
    pub fn new(connector: C, options: PoolOptions) -> Self {
        let (status, _) = watch::channel(PoolStatus::Uninitialized);
        Self {
            pool: ConnectionPool::new(connector, options),
            status,
        }
    }

    /// Returns the pool for data-access code.
    #[must_use]
    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    /// Returns the current readiness state.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.status.borrow().clone()
    }

    /// Subscribes to readiness changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PoolStatus> {
        self.status.subscribe()
    }

    /// Returns current pool occupancy.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Probes the database by checking out one connection and handing it
    /// straight back.
    ///
    /// Never fails: an unreachable database is logged and recorded as
    /// [`PoolStatus::Degraded`]. Returns the resulting state.
    pub async fn health_check(&self) -> PoolStatus {
        if !self.transition(PoolStatus::Initializing) {
            return PoolStatus::Closed;
        }

        let outcome = match self.pool.acquire().await {
            Ok(conn) => {
                conn.release();
                tracing::info!("database connection successful");
                PoolStatus::Healthy
            }
            Err(err) => {
                tracing::error!(error = %err, "database connection failed");
                PoolStatus::Degraded {
                    reason: err.to_string(),
                }
            }
        };

        if self.transition(outcome.clone()) {
            outcome
        } else {
            PoolStatus::Closed
        }
    }

    /// Runs [`health_check`](Self::health_check) on a background task.
    pub fn spawn_health_check(self: &Arc<Self>) -> JoinHandle<PoolStatus> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.health_check().await })
    }

    /// Checks out a connection from the shared pool.
    ///
    /// A successful checkout while [`PoolStatus::Degraded`] marks the
    /// database healthy again.
    ///
    /// # Errors
    ///
    /// See [`ConnectionPool::acquire`].
    pub async fn acquire(&self) -> Result<PooledConnection<C>, PoolError> {
        let conn = self.pool.acquire().await?;
        let recovered = self.status.send_if_modified(|status| {
            if matches!(status, PoolStatus::Degraded { .. }) {
                *status = PoolStatus::Healthy;
                true
            } else {
                false
            }
        });
        if recovered {
            tracing::info!("database connection recovered");
        }
        Ok(conn)
    }

    /// Closes the pool. Later checkouts fail with [`PoolError::Closed`].
    pub async fn close(&self) {
        self.status.send_replace(PoolStatus::Closed);
        self.pool.close().await;
        tracing::info!("database pool closed");
    }

    /// Moves to `next` unless the pool is already closed.
    fn transition(&self, next: PoolStatus) -> bool {
        let mut applied = false;
        self.status.send_if_modified(|status| {
            if *status == PoolStatus::Closed {
                return false;
            }
            applied = true;
            *status = next;
            true
        });
        applied
    }
}

impl<C: Connector> fmt::Debug for PoolManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManager")
            .field("pool", &self.pool)
            .field("status", &*self.status.borrow())
            .finish()
    }
}
