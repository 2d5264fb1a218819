//! In-memory connector for pool tests.

use std::future::{Future, ready};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::Connector;

/// Hands out numbered fake connections and counts calls.
#[derive(Debug, Default)]
pub(crate) struct MockConnector {
    opened: AtomicUsize,
    closed: AtomicUsize,
    pings: AtomicUsize,
    failing: AtomicBool,
}

impl MockConnector {
    /// Makes subsequent `connect` calls fail with "connection refused".
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    type Connection = usize;

    fn connect(&self) -> impl Future<Output = Result<usize, sqlx::Error>> + Send {
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        } else {
            Ok(self.opened.fetch_add(1, Ordering::SeqCst) + 1)
        };
        ready(result)
    }

    fn ping(&self, _conn: &mut usize) -> impl Future<Output = Result<(), sqlx::Error>> + Send {
        self.pings.fetch_add(1, Ordering::SeqCst);
        ready(Ok(()))
    }

    fn close(&self, _conn: usize) -> impl Future<Output = Result<(), sqlx::Error>> + Send {
        self.closed.fetch_add(1, Ordering::SeqCst);
        ready(Ok(()))
    }
}
