//! Physical connection factories.

use std::fmt;
use std::future::Future;

use sqlx::Connection;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlSslMode};

use crate::config::DatabaseConfig;

/// Opens, checks and closes the physical connections a
/// [`ConnectionPool`](super::ConnectionPool) hands out.
pub trait Connector: fmt::Debug + Send + Sync + 'static {
    /// Connection type handed out by the pool.
    type Connection: Send + 'static;

    /// Opens a new physical connection.
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, sqlx::Error>> + Send;

    /// Round-trips to the server to confirm the connection is usable.
    fn ping(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Gracefully closes a physical connection.
    fn close(&self, conn: Self::Connection) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

/// Opens MySQL connections from a [`DatabaseConfig`].
///
/// Building the connector performs no I/O; the server is first contacted
/// on [`Connector::connect`].
pub struct MySqlConnector {
    options: MySqlConnectOptions,
    endpoint: String,
}

impl MySqlConnector {
    /// Builds connect options from the configuration.
    ///
    /// Unset host, user or schema fall back to the driver defaults.
    #[must_use]
    pub fn new(config: &DatabaseConfig) -> Self {
        let mut options = MySqlConnectOptions::new()
            .port(config.port)
            .ssl_mode(ssl_mode(config));
        if let Some(host) = &config.host {
            options = options.host(host);
        }
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        if let Some(database) = &config.database {
            options = options.database(database);
        }

        let endpoint = format!(
            "{}:{}/{}",
            config.host.as_deref().unwrap_or("localhost"),
            config.port,
            config.database.as_deref().unwrap_or_default()
        );

        Self { options, endpoint }
    }

    /// Returns `host:port/database` for log lines.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for MySqlConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConnector")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Connector for MySqlConnector {
    type Connection = MySqlConnection;

    fn connect(&self) -> impl Future<Output = Result<Self::Connection, sqlx::Error>> + Send {
        MySqlConnection::connect_with(&self.options)
    }

    fn ping(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send {
        conn.ping()
    }

    fn close(&self, conn: Self::Connection) -> impl Future<Output = Result<(), sqlx::Error>> + Send {
        conn.close()
    }
}

/// TLS is requested without certificate checks unless `tls_verify` is on.
fn ssl_mode(config: &DatabaseConfig) -> MySqlSslMode {
    match (config.tls, config.tls_verify) {
        (false, _) => MySqlSslMode::Disabled,
        (true, false) => MySqlSslMode::Required,
        (true, true) => MySqlSslMode::VerifyIdentity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssl_mode_follows_tls_flags() {
        let mut config = DatabaseConfig::default();
        assert!(matches!(ssl_mode(&config), MySqlSslMode::Required));

        config.tls_verify = true;
        assert!(matches!(ssl_mode(&config), MySqlSslMode::VerifyIdentity));

        config.tls = false;
        assert!(matches!(ssl_mode(&config), MySqlSslMode::Disabled));
    }

    #[test]
    fn endpoint_uses_defaults_for_missing_settings() {
        let connector = MySqlConnector::new(&DatabaseConfig::default());
        assert_eq!(connector.endpoint(), "localhost:3306/");
    }

    #[test]
    fn debug_output_hides_credentials() {
        let config = DatabaseConfig {
            host: Some("db.internal".to_string()),
            password: Some("hunter2".to_string()),
            database: Some("erp".to_string()),
            ..DatabaseConfig::default()
        };
        let connector = MySqlConnector::new(&config);
        let rendered = format!("{connector:?}");
        assert!(rendered.contains("db.internal:3306/erp"));
        assert!(!rendered.contains("hunter2"));
    }
}
