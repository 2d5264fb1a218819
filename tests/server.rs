//! End-to-end checks over a real TCP listener.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use erp_gateway::config::{AppConfig, DatabaseConfig};
use erp_gateway::db::{Database, PoolManager, PoolStatus};
use erp_gateway::error::ServerError;
use erp_gateway::server;

struct TestServer {
    addr: SocketAddr,
    database: Arc<Database>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Starts the gateway against a database address that refuses
    /// connections.
    async fn start() -> Self {
        let config = DatabaseConfig {
            host: Some("127.0.0.1".to_string()),
            port: 1,
            tls: false,
            ..DatabaseConfig::default()
        };
        let database = Arc::new(PoolManager::initialize(&config));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::run(listener, Arc::clone(&database), async move {
            let _ = stopped.await;
        }));

        Self {
            addr,
            database,
            stop,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn wait_until_probed(&self) -> PoolStatus {
        let mut rx = self.database.subscribe();
        let status = tokio::time::timeout(Duration::from_secs(10), rx.wait_for(PoolStatus::is_ready))
            .await
            .expect("health check finished in time")
            .expect("status channel open");
        status.clone()
    }

    async fn stop(self) -> Arc<Database> {
        let _ = self.stop.send(());
        let result = self.handle.await.expect("server task joined");
        assert!(result.is_ok(), "server exited with {result:?}");
        self.database
    }
}

#[tokio::test]
async fn serves_modules_while_database_is_unreachable() {
    let server = TestServer::start().await;

    let status = server.wait_until_probed().await;
    assert!(matches!(status, PoolStatus::Degraded { .. }), "{status:?}");

    let response = reqwest::get(server.url("/api/v1/sales/")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["module"], "sales");

    let response = reqwest::get(server.url("/api/v1/operations")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let response = reqwest::get(server.url("/api/v1/unknown")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let response = reqwest::get(server.url("/api/v1/operations/missing")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], 2001);

    server.stop().await;
}

#[tokio::test]
async fn health_exposes_degraded_mode() {
    let server = TestServer::start().await;
    server.wait_until_probed().await;

    let response = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"]["state"], "degraded");
    assert_eq!(body["pool"]["in_use"], 0);

    server.stop().await;
}

#[tokio::test]
async fn database_request_fails_without_taking_the_listener_down() {
    let server = TestServer::start().await;
    server.wait_until_probed().await;

    let response = reqwest::get(server.url("/api/v1/analytics/db-check"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let response = reqwest::get(server.url("/api/v1/analytics/")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn shutdown_closes_the_pool() {
    let server = TestServer::start().await;
    server.wait_until_probed().await;

    let database = server.stop().await;
    assert_eq!(database.status(), PoolStatus::Closed);
    assert!(database.pool().is_closed());
}

#[test]
fn port_from_environment_lookup() {
    let config = AppConfig::from_lookup(|key| (key == "PORT").then(|| "9100".to_string())).unwrap();
    assert_eq!(config.listen_addr.port(), 9100);
    assert_eq!(config.database.max_connections, 10);
    assert_eq!(config.database.queue_limit, 0);
}
