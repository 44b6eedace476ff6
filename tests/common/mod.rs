//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use mesh_control::client::ControlClient;
use mesh_control::config::ControlConfig;
use mesh_control::control::ControlService;
use mesh_control::http::ControlServer;
use mesh_control::lifecycle::Shutdown;

/// A control plane running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub service: Arc<ControlService>,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> ControlClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        ControlClient::new(&self.base_url())
            .unwrap()
            .with_http_client(http)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a control plane with default settings.
pub async fn start_server() -> TestServer {
    start_server_with(ControlConfig::default()).await
}

/// Start a control plane bound to `127.0.0.1:0`.
pub async fn start_server_with(config: ControlConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = ControlServer::new(config, shutdown.clone());
    let service = server.service();

    let (_, config_updates) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates).await;
    });

    TestServer {
        addr,
        shutdown,
        service,
    }
}

/// Poll `check` until it holds or `limit` elapses.
pub async fn eventually<F>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
