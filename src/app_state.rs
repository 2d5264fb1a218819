//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::db::Database;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The process-wide database pool. Handlers borrow connections from it
    /// and never construct their own.
    pub database: Arc<Database>,
}

impl AppState {
    /// Creates state around the shared pool manager.
    #[must_use]
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }
}
