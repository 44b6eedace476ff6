//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with proxy-facing and admin routes
//! - Wire up middleware (request timeout, tracing)
//! - Serve on a listener until shutdown
//! - Apply hot-reloaded route tables and broadcast them

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::config::{ControlConfig, StreamingConfig};
use crate::control::ControlService;
use crate::http::{handlers, websocket};
use crate::lifecycle::Shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ControlService>,
    pub streaming: StreamingConfig,
    pub subscription_slots: Arc<Semaphore>,
    pub admin_key: Option<Arc<str>>,
    pub shutdown: Shutdown,
}

impl AppState {
    pub fn new(config: &ControlConfig, service: Arc<ControlService>, shutdown: Shutdown) -> Self {
        Self {
            service,
            streaming: config.streaming.clone(),
            subscription_slots: Arc::new(Semaphore::new(config.listener.max_subscriptions)),
            admin_key: config.admin.api_key.as_deref().map(Arc::from),
            shutdown,
        }
    }
}

/// HTTP/WebSocket server for the control plane.
pub struct ControlServer {
    router: Router,
    config: ControlConfig,
    service: Arc<ControlService>,
    shutdown: Shutdown,
}

impl ControlServer {
    /// Create a server with a fresh service seeded from `config.routes`.
    pub fn new(config: ControlConfig, shutdown: Shutdown) -> Self {
        let service = Arc::new(ControlService::with_routes(
            config.initial_routes(),
            config.streaming.sink_capacity,
        ));
        Self::with_service(config, service, shutdown)
    }

    /// Create a server around an existing service.
    pub fn with_service(config: ControlConfig, service: Arc<ControlService>, shutdown: Shutdown) -> Self {
        if config.admin.api_key.is_none() {
            tracing::warn!("Admin API key not set; /admin endpoints are unauthenticated");
        }

        let state = AppState::new(&config, Arc::clone(&service), shutdown.clone());
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            service,
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(config: &ControlConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/v1/proxies/register", post(handlers::register_proxy))
            .route("/v1/config", get(handlers::get_config))
            .route("/v1/config/subscribe", get(websocket::subscribe_config))
            .merge(admin::router(state.clone()))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(TraceLayer::new_for_http())
    }

    pub fn service(&self) -> Arc<ControlService> {
        Arc::clone(&self.service)
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Serve on `listener` until the shutdown signal fires.
    ///
    /// Configs received on `config_updates` replace the route table when
    /// their routes differ from the live ones.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ControlConfig>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Control plane listening");

        tokio::spawn(apply_reloads(
            Arc::clone(&self.service),
            config_updates,
            self.shutdown.subscribe(),
        ));

        let mut stop = self.shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Control plane stopped");
        Ok(())
    }
}

async fn apply_reloads(
    service: Arc<ControlService>,
    mut config_updates: mpsc::UnboundedReceiver<ControlConfig>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = config_updates.recv() => {
                let Some(config) = update else { break };
                apply_reload(&service, &config);
            }
            _ = shutdown.recv() => break,
        }
    }
}

fn apply_reload(service: &ControlService, config: &ControlConfig) {
    let routes = config.initial_routes();
    if routes == service.store().snapshot().routes {
        tracing::debug!("Reloaded config has unchanged routes");
        return;
    }

    let (snapshot, report) = service.replace_and_broadcast(routes);
    tracing::info!(
        version = snapshot.version,
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "Applied reloaded route table"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::control::{ConfigSnapshot, ProxyIdentity, RegistrationResult, Route};

    fn test_server(api_key: Option<&str>) -> ControlServer {
        let mut config = ControlConfig::default();
        config.admin.api_key = api_key.map(str::to_string);
        ControlServer::new(config, Shutdown::new())
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_register_proxy() {
        let server = test_server(None);
        let request = Request::post("/v1/proxies/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"proxyId":"p1","version":"1.0","listenAddr":":8080"}"#))
            .unwrap();

        let response = server.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let result: RegistrationResult = body_json(response).await;
        assert!(result.success);
        assert!(server.service().registry().contains("p1"));
    }

    #[tokio::test]
    async fn test_get_config() {
        let server = test_server(None);
        let request = Request::get("/v1/config").body(Body::empty()).unwrap();
        let response = server.router.clone().oneshot(request).await.unwrap();

        let snapshot: ConfigSnapshot = body_json(response).await;
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.routes, vec![Route::default_route()]);
    }

    #[test]
    fn test_apply_reload_only_on_change() {
        let service = ControlService::default();
        let mut config = ControlConfig::default();

        apply_reload(&service, &config);
        assert_eq!(service.store().version(), 1);

        config.routes = vec![Route::new("/new", "localhost:9000")];
        apply_reload(&service, &config);
        assert_eq!(service.store().version(), 2);
        assert_eq!(service.store().snapshot().routes[0].path, "/new");
    }

    #[tokio::test]
    async fn test_subscribe_requires_proxy_id() {
        let server = test_server(None);
        let request = Request::get("/v1/config/subscribe").body(Body::empty()).unwrap();
        let response = server.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(server.service().connected_proxies().is_empty());
    }

    #[tokio::test]
    async fn test_proxies_list_after_register() {
        let server = test_server(None);
        server
            .service()
            .register_proxy(ProxyIdentity::new("p9", "1.0", ":9"));

        let request = Request::get("/admin/proxies").body(Body::empty()).unwrap();
        let response = server.router.clone().oneshot(request).await.unwrap();
        let proxies: Vec<ProxyIdentity> = body_json(response).await;
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].proxy_id, "p9");
    }
}
