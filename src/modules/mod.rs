//! Domain modules, each owning one versioned route namespace.
//!
//! The business routes of each domain live with their owning teams; this
//! crate only provides the mount point, a module descriptor and a
//! database round-trip check per module.

pub mod handlers;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;

/// Version segment shared by every domain prefix.
pub const API_PREFIX: &str = "/api/v1";

/// The domain modules served by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// `/api/v1/sales`.
    Sales,
    /// `/api/v1/operations`.
    Operations,
    /// `/api/v1/analytics`.
    Analytics,
}

impl Domain {
    /// Every domain, in mount order.
    pub const ALL: [Self; 3] = [Self::Sales, Self::Operations, Self::Analytics];

    /// Lowercase module name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Operations => "operations",
            Self::Analytics => "analytics",
        }
    }

    /// Mount prefix, e.g. `/api/v1/sales`.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Sales => "/api/v1/sales",
            Self::Operations => "/api/v1/operations",
            Self::Analytics => "/api/v1/analytics",
        }
    }

    /// Builds the module's router. Paths are relative to [`Self::prefix`];
    /// unknown sub-routes answer with the same JSON 404 as a prefix miss.
    pub fn routes(self) -> Router<AppState> {
        Router::new()
            .route("/", get(move || handlers::module_info(self)))
            .route("/db-check", get(handlers::db_check))
            .fallback(handlers::route_not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_versioned_and_named() {
        for domain in Domain::ALL {
            assert_eq!(
                domain.prefix(),
                format!("{API_PREFIX}/{}", domain.name())
            );
        }
    }
}
