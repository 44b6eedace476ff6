//! Operator API: route mutations, broadcast, introspection.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub use self::handlers::{ConfigUpdateResponse, StatusResponse};

/// Admin routes, guarded by the Bearer key when one is configured.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/proxies", get(list_proxies))
        .route("/admin/proxies/{proxy_id}", delete(remove_proxy))
        .route("/admin/routes", post(append_route).put(replace_routes))
        .route("/admin/broadcast", post(broadcast))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
