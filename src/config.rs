//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Missing database credentials are not
//! an error; the pool is built with empty credentials and the failure
//! surfaces at the startup health check or on first use.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};

use crate::error::ConfigError;

/// Port the HTTP listener binds to when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8000;

/// MySQL port used when `DB_PORT` is unset.
pub const DEFAULT_DB_PORT: u16 = 3306;

/// Maximum physical connections when `DB_MAX_CONNECTIONS` is unset.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Top-level process configuration.
///
/// Loaded once at startup via [`AppConfig::from_env`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to (`0.0.0.0:$PORT`).
    pub listen_addr: SocketAddr,

    /// Connection settings for the shared database pool.
    pub database: DatabaseConfig,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

/// Settings for the shared MySQL connection pool.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database host (`DB_HOST`).
    pub host: Option<String>,

    /// Database port (`DB_PORT`).
    pub port: u16,

    /// Login user (`DB_USER`).
    pub user: Option<String>,

    /// Login password (`DB_PASSWORD`).
    pub password: Option<String>,

    /// Default schema (`DB_NAME`).
    pub database: Option<String>,

    /// Upper bound on concurrent physical connections.
    pub max_connections: u32,

    /// Maximum callers allowed to wait for a connection. `0` = unbounded.
    pub queue_limit: u32,

    /// Negotiate TLS with the server.
    pub tls: bool,

    /// Verify the server certificate and host name when TLS is on.
    pub tls_verify: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_DB_PORT,
            user: None,
            password: None,
            database: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            queue_limit: 0,
            tls: true,
            tls_verify: false,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("queue_limit", &self.queue_limit)
            .field("tls", &self.tls)
            .field("tls_verify", &self.tls_verify)
            .finish()
    }
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `PORT` is set but is not a
    /// valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `PORT` cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "PORT",
                    value: raw.clone(),
                })?,
            None => DEFAULT_PORT,
        };

        let database = DatabaseConfig {
            host: var("DB_HOST"),
            port: parse_var(&var, "DB_PORT", DEFAULT_DB_PORT),
            user: var("DB_USER"),
            password: var("DB_PASSWORD"),
            database: var("DB_NAME"),
            max_connections: parse_var(&var, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            queue_limit: parse_var(&var, "DB_QUEUE_LIMIT", 0),
            tls: parse_var_bool(&var, "DB_TLS", true),
            tls_verify: parse_var_bool(&var, "DB_TLS_VERIFY", false),
        };

        let log_json = is_json_log_format(var("LOG_FORMAT").as_deref());

        Ok(Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            database,
            log_json,
        })
    }
}

/// Returns `true` if a `LOG_FORMAT` value asks for JSON log lines.
///
/// Exposed so the binary can pick its log format before the rest of the
/// configuration is parsed and logged.
#[must_use]
pub fn is_json_log_format(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_var<T, F>(var: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

/// Parses a variable as a boolean. Accepts `"true"`, `"1"`, `"false"`,
/// `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_var_bool<F>(var: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match var(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
