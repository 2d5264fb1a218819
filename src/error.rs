//! Error types for the gateway, with HTTP status code mapping.
//!
//! [`ApiError`] is the only error that reaches clients. Each variant maps
//! to a specific HTTP status code and structured JSON error response.
//! The remaining enums cover startup configuration ([`ConfigError`]),
//! route assembly ([`ComposeError`]), the connection pool ([`PoolError`])
//! and the server run loop ([`ServerError`]).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "route not found: /api/v1/unknown"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`ApiError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Client-facing error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                   |
/// |-----------|-----------------|-------------------------------|
/// | 2000–2999 | Routing         | 404 Not Found                 |
/// | 3000–3999 | Server          | 500 / 503                     |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No mounted module owns the request path.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// The pool is saturated and its wait queue is full.
    #[error("database connection pool exhausted")]
    PoolExhausted,

    /// The pool was closed during shutdown.
    #[error("database connection pool is closed")]
    PoolClosed,

    /// Connecting to or talking with the database failed.
    #[error("database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::RouteNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::Database(_) => 3001,
            Self::PoolExhausted => 3002,
            Self::PoolClosed => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Self::PoolExhausted | Self::PoolClosed => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PoolError> for ApiError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Exhausted { .. } => Self::PoolExhausted,
            PoolError::Closed => Self::PoolClosed,
            PoolError::Connect(e) | PoolError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Connection pool failures.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Every connection is checked out and the wait queue is at its limit.
    #[error("connection pool exhausted: {waiting} callers already waiting")]
    Exhausted {
        /// Number of callers queued when the attempt was rejected.
        waiting: usize,
    },

    /// The pool has been closed.
    #[error("connection pool is closed")]
    Closed,

    /// Opening a physical connection failed.
    #[error("failed to open database connection: {0}")]
    Connect(#[source] sqlx::Error),

    /// An operation on an open connection failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Route table assembly failures. Always fatal at startup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ComposeError {
    /// A router is already mounted at this prefix.
    #[error("prefix already mounted: {0}")]
    DuplicatePrefix(String),

    /// The prefix is not a usable mount point.
    #[error("invalid mount prefix {prefix:?}: {reason}")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable is set but cannot be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Environment variable name.
        key: &'static str,
        /// The raw value found.
        value: String,
    },
}

/// Failures of the HTTP server run loop.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The route table could not be assembled.
    #[error("route composition failed: {0}")]
    Compose(#[from] ComposeError),

    /// Listener or connection I/O failed.
    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),
}
