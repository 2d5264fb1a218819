//! Bounded connection pool with a FIFO wait queue.
//!
//! [`ConnectionPool`] hands out at most `max_connections` slots. Callers
//! that find every slot taken join a queue of `oneshot` senders kept under
//! the pool mutex. A returned slot is passed to the oldest live waiter in
//! the same critical section that removes it from the queue, so a later
//! caller can neither take that slot nor see the served waiter as queued.
//!
//! The mutex is only held for bookkeeping and never across an `.await`.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::oneshot;
use utoipa::ToSchema;

use super::Connector;
use crate::config::{DEFAULT_MAX_CONNECTIONS, DatabaseConfig};
use crate::error::PoolError;

/// Sizing of a [`ConnectionPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Upper bound on concurrent physical connections. Values below 1 are
    /// raised to 1.
    pub max_connections: u32,
    /// Maximum number of callers allowed to wait for a connection.
    /// `0` means waiting is unbounded, not that waiting is disallowed.
    pub queue_limit: u32,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            queue_limit: 0,
        }
    }
}

impl From<&DatabaseConfig> for PoolOptions {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            queue_limit: config.queue_limit,
        }
    }
}

/// Point-in-time pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PoolStats {
    /// Configured connection cap.
    pub max_connections: u32,
    /// Configured wait-queue cap (`0` = unbounded).
    pub queue_limit: u32,
    /// Connection slots currently checked out.
    pub in_use: usize,
    /// Open connections parked in the pool.
    pub idle: usize,
    /// Callers queued for a slot.
    pub waiting: usize,
}

struct PoolState<C: Connector> {
    /// Slots nobody holds. Only non-zero while no live waiter is queued.
    free: usize,
    idle: Vec<C::Connection>,
    waiters: VecDeque<oneshot::Sender<Slot<C>>>,
    closed: bool,
}

impl<C: Connector> PoolState<C> {
    /// Forgets waiters whose acquire future was dropped.
    fn prune_waiters(&mut self) -> usize {
        self.waiters.retain(|waiter| !waiter.is_closed());
        self.waiters.len()
    }
}

struct PoolInner<C: Connector> {
    connector: C,
    options: PoolOptions,
    state: Mutex<PoolState<C>>,
}

impl<C: Connector> PoolInner<C> {
    fn state(&self) -> MutexGuard<'_, PoolState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes back a slot, parking `conn` if one comes with it, and hands
    /// the slot to the oldest waiter still listening.
    fn release(self: &Arc<Self>, conn: Option<C::Connection>) {
        let mut state = self.state();
        if state.closed {
            // Checked out across close(): drop instead of parking it.
            state.free = state.free.saturating_add(1);
            return;
        }
        if let Some(conn) = conn {
            state.idle.push(conn);
        }

        let mut slot = Slot::new(self);
        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.send(slot) {
                Ok(()) => return,
                Err(returned) => slot = returned,
            }
        }
        slot.disarm();
        state.free = state.free.saturating_add(1);
    }
}

/// The right to hold one connection. Dropping an armed slot returns it to
/// the pool, including when it dies inside an abandoned `oneshot`.
struct Slot<C: Connector> {
    pool: Option<Arc<PoolInner<C>>>,
}

impl<C: Connector> Slot<C> {
    fn new(pool: &Arc<PoolInner<C>>) -> Self {
        Self {
            pool: Some(Arc::clone(pool)),
        }
    }

    fn disarm(&mut self) {
        self.pool = None;
    }

    fn give_back(&mut self, conn: Option<C::Connection>) {
        if let Some(pool) = self.pool.take() {
            pool.release(conn);
        }
    }
}

impl<C: Connector> Drop for Slot<C> {
    fn drop(&mut self) {
        self.give_back(None);
    }
}

/// Shared, bounded pool of database connections.
///
/// Cloning is cheap and yields another handle to the same pool.
pub struct ConnectionPool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("connector", &self.inner.connector)
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<C: Connector> ConnectionPool<C> {
    /// Creates a pool. No connection is opened until the first
    /// [`acquire`](Self::acquire).
    #[must_use]
    pub fn new(connector: C, options: PoolOptions) -> Self {
        let options = PoolOptions {
            max_connections: options.max_connections.max(1),
            ..options
        };
        Self {
            inner: Arc::new(PoolInner {
                connector,
                options,
                state: Mutex::new(PoolState {
                    free: usize::try_from(options.max_connections).unwrap_or(usize::MAX),
                    idle: Vec::new(),
                    waiters: VecDeque::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Returns the connection factory backing this pool.
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    /// Returns the effective pool sizing.
    #[must_use]
    pub fn options(&self) -> PoolOptions {
        self.inner.options
    }

    /// Checks out a connection.
    ///
    /// Reuses an idle connection when one is parked, otherwise opens a new
    /// one. When every slot is taken the caller waits in FIFO order.
    /// Dropping the returned future while waiting leaves the queue.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Exhausted`] if every slot is taken and `queue_limit`
    ///   callers are already waiting.
    /// - [`PoolError::Closed`] if the pool is closed before a slot frees up.
    /// - [`PoolError::Connect`] if a new physical connection cannot be
    ///   opened. The slot is released again.
    pub async fn acquire(&self) -> Result<PooledConnection<C>, PoolError> {
        let slot = self.acquire_slot().await?;

        let parked = self.inner.state().idle.pop();
        let conn = match parked {
            Some(conn) => conn,
            None => self
                .inner
                .connector
                .connect()
                .await
                .map_err(PoolError::Connect)?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            slot,
        })
    }

    async fn acquire_slot(&self) -> Result<Slot<C>, PoolError> {
        let handoff = {
            let mut state = self.inner.state();
            if state.closed {
                return Err(PoolError::Closed);
            }
            if state.free > 0 {
                state.free -= 1;
                return Ok(Slot::new(&self.inner));
            }

            let waiting = state.prune_waiters();
            let limit = usize::try_from(self.inner.options.queue_limit).unwrap_or(usize::MAX);
            if limit != 0 && waiting >= limit {
                return Err(PoolError::Exhausted { waiting });
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            tracing::debug!(
                waiting = waiting.saturating_add(1),
                "waiting for a free database connection"
            );
            rx
        };

        let slot = handoff.await.map_err(|_| PoolError::Closed)?;
        if self.is_closed() {
            // Handed over just before close(); dropping the slot returns it.
            return Err(PoolError::Closed);
        }
        Ok(slot)
    }

    /// Returns current occupancy.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let max = usize::try_from(self.inner.options.max_connections).unwrap_or(usize::MAX);
        let state = self.inner.state();
        PoolStats {
            max_connections: self.inner.options.max_connections,
            queue_limit: self.inner.options.queue_limit,
            in_use: max.saturating_sub(state.free),
            idle: state.idle.len(),
            waiting: state.waiters.iter().filter(|w| !w.is_closed()).count(),
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state().closed
    }

    /// Closes the pool.
    ///
    /// Queued callers fail with [`PoolError::Closed`], parked connections
    /// are closed, and connections still checked out are dropped when
    /// they come back. Calling it again is a no-op.
    pub async fn close(&self) {
        let (parked, waiters) = {
            let mut state = self.inner.state();
            if state.closed {
                return;
            }
            state.closed = true;
            (
                std::mem::take(&mut state.idle),
                std::mem::take(&mut state.waiters),
            )
        };
        // Dropping the senders fails every queued acquire.
        drop(waiters);

        let count = parked.len();
        for conn in parked {
            if let Err(err) = self.inner.connector.close(conn).await {
                tracing::warn!(error = %err, "error closing database connection");
            }
        }
        tracing::debug!(closed = count, "connection pool closed");
    }
}

/// A connection checked out of a [`ConnectionPool`].
///
/// Dereferences to the underlying connection. Dropping it (or calling
/// [`release`](Self::release)) parks the connection and serves the oldest
/// waiter.
pub struct PooledConnection<C: Connector> {
    conn: Option<C::Connection>,
    pool: Arc<PoolInner<C>>,
    slot: Slot<C>,
}

impl<C: Connector> PooledConnection<C> {
    /// Returns the connection to the pool.
    pub fn release(self) {
        drop(self);
    }

    /// Round-trips to the server through the pool's connector.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Database`] if the server does not answer.
    pub async fn ping(&mut self) -> Result<(), PoolError> {
        let pool = Arc::clone(&self.pool);
        pool.connector.ping(&mut **self).await?;
        Ok(())
    }

    /// Closes the connection instead of returning it, freeing its slot for
    /// a fresh connection. Used for connections that are known broken.
    pub async fn discard(mut self) {
        if let Some(conn) = self.conn.take()
            && let Err(err) = self.pool.connector.close(conn).await
        {
            tracing::debug!(error = %err, "error closing discarded connection");
        }
    }
}

impl<C: Connector> Deref for PooledConnection<C> {
    type Target = C::Connection;

    fn deref(&self) -> &Self::Target {
        match self.conn.as_ref() {
            Some(conn) => conn,
            None => unreachable!("connection is only taken on release"),
        }
    }
}

impl<C: Connector> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.conn.as_mut() {
            Some(conn) => conn,
            None => unreachable!("connection is only taken on release"),
        }
    }
}

impl<C: Connector> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        let conn = self.conn.take();
        self.slot.give_back(conn);
    }
}

impl<C: Connector> fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("connector", &self.pool.connector)
            .finish_non_exhaustive()
    }
}
