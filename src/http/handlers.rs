//! Unary proxy-facing handlers.

use axum::{extract::State, Json};

use crate::control::{ConfigSnapshot, ProxyIdentity, RegistrationResult};
use crate::http::server::AppState;

pub async fn health() -> &'static str {
    "ok"
}

/// `RegisterProxy`: record the caller's identity without a push channel.
pub async fn register_proxy(
    State(state): State<AppState>,
    Json(identity): Json<ProxyIdentity>,
) -> Json<RegistrationResult> {
    Json(state.service.register_proxy(identity))
}

/// Current snapshot, for proxies that only want to read once.
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigSnapshot> {
    let snapshot = state.service.store().snapshot();
    Json(ConfigSnapshot::clone(&snapshot))
}
