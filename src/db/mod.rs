//! Database layer: the shared connection pool and its lifecycle.
//!
//! - [`Connector`] opens physical connections ([`MySqlConnector`] in
//!   production).
//! - [`ConnectionPool`] bounds them and queues callers FIFO.
//! - [`PoolManager`] owns the single pool, runs the startup probe and
//!   exposes readiness.

pub mod connector;
pub mod manager;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use connector::{Connector, MySqlConnector};
pub use manager::{PoolManager, PoolStatus};
pub use pool::{ConnectionPool, PoolOptions, PoolStats, PooledConnection};

/// The production pool manager.
pub type Database = PoolManager<MySqlConnector>;
