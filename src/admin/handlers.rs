use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{validate_routes, ValidationError};
use crate::control::{BroadcastReport, ConfigSnapshot, Eviction, ProxyIdentity, Route};
use crate::http::server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: String,
    pub status: String,
    pub config_version: i64,
    pub registered_proxies: usize,
    pub subscribed_proxies: usize,
}

/// Result of a route mutation: the new snapshot and its broadcast outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigUpdateResponse {
    pub snapshot: ConfigSnapshot,
    pub report: BroadcastReport,
}

#[derive(Serialize)]
struct ErrorBody {
    errors: Vec<String>,
}

fn bad_request(errors: Vec<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { errors })).into_response()
}

fn invalid_routes(errors: Vec<ValidationError>) -> Response {
    bad_request(errors.iter().map(ToString::to_string).collect())
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let registry = state.service.registry();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        config_version: state.service.store().version(),
        registered_proxies: registry.len(),
        subscribed_proxies: registry.subscribed_count(),
    })
}

/// `GetConnectedProxies`.
pub async fn list_proxies(State(state): State<AppState>) -> Json<Vec<ProxyIdentity>> {
    Json(state.service.connected_proxies())
}

/// Evict a registration whose proxy never subscribed.
///
/// Entries with an open stream answer 409; they leave the registry when
/// their stream ends.
pub async fn remove_proxy(
    State(state): State<AppState>,
    Path(proxy_id): Path<String>,
) -> StatusCode {
    match state.service.registry().evict_unsubscribed(&proxy_id) {
        Eviction::Removed(_) => {
            tracing::info!(proxy_id = %proxy_id, "Proxy removed by operator");
            StatusCode::NO_CONTENT
        }
        Eviction::Subscribed => {
            tracing::warn!(proxy_id = %proxy_id, "Refusing to evict proxy with an open stream");
            StatusCode::CONFLICT
        }
        Eviction::Missing => StatusCode::NOT_FOUND,
    }
}

pub async fn replace_routes(
    State(state): State<AppState>,
    Json(routes): Json<Vec<Route>>,
) -> Response {
    if let Err(errors) = validate_routes(&routes) {
        return invalid_routes(errors);
    }
    let (snapshot, report) = state.service.replace_and_broadcast(routes);
    Json(ConfigUpdateResponse {
        snapshot: ConfigSnapshot::clone(&snapshot),
        report,
    })
    .into_response()
}

pub async fn append_route(State(state): State<AppState>, Json(route): Json<Route>) -> Response {
    if let Err(errors) = validate_routes(std::slice::from_ref(&route)) {
        return invalid_routes(errors);
    }
    let (snapshot, report) = state.service.append_and_broadcast(route);
    Json(ConfigUpdateResponse {
        snapshot: ConfigSnapshot::clone(&snapshot),
        report,
    })
    .into_response()
}

/// `BroadcastConfigUpdate`. An empty body pushes the store's current snapshot.
pub async fn broadcast(State(state): State<AppState>, body: Bytes) -> Response {
    let snapshot = if body.is_empty() {
        state.service.store().snapshot()
    } else {
        match serde_json::from_slice::<ConfigSnapshot>(&body) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => return bad_request(vec![format!("invalid snapshot: {}", e)]),
        }
    };

    Json(state.service.broadcast(snapshot)).into_response()
}
