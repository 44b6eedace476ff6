//! `SubscribeConfig` over WebSocket.
//!
//! # Responsibilities
//! - Gate new streams on the subscription limit
//! - Open a `Subscription` and write every snapshot it yields as a frame
//! - Treat peer close and read errors as cancellation
//! - Close with "going away" on server shutdown
//!
//! # Data Flow
//! ```text
//! Proxy ──── GET /v1/config/subscribe?proxyId=.. (upgrade) ───▶ Control plane
//! Proxy ◀─── text frame: initial ConfigSnapshot ─────────────── Subscription
//! Proxy ◀─── text frame: broadcast ConfigSnapshot ... ───────── Subscription
//! ```
//!
//! # Design Decisions
//! - Each frame write is bounded by `send_timeout_ms`
//! - The `Subscription` is dropped on every exit path, which removes the
//!   registry entry; nothing here touches the registry directly

use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::control::{ConfigSnapshot, ProxyIdentity, StreamError};
use crate::http::server::AppState;

/// Upgrade handler for `GET /v1/config/subscribe`.
pub async fn subscribe_config(
    State(state): State<AppState>,
    Query(identity): Query<ProxyIdentity>,
    ws: WebSocketUpgrade,
) -> Response {
    let permit = match state.subscription_slots.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!(proxy_id = %identity.proxy_id, "Subscription limit reached, refusing stream");
            return (StatusCode::SERVICE_UNAVAILABLE, "Subscription limit reached").into_response();
        }
    };

    tracing::info!(
        proxy_id = %identity.proxy_id,
        version = %identity.version,
        "Proxy connecting for config stream"
    );

    let shutdown = state.shutdown.subscribe();
    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        let proxy_id = identity.proxy_id.clone();
        if let Err(e) = stream_config(socket, state, identity, shutdown).await {
            tracing::error!(proxy_id = %proxy_id, error = %e, "Config stream failed");
        }
    })
}

async fn stream_config(
    socket: WebSocket,
    state: AppState,
    identity: ProxyIdentity,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), StreamError> {
    let (mut sender, mut receiver) = socket.split();
    let send_timeout = Duration::from_millis(state.streaming.send_timeout_ms);
    let proxy_id = identity.proxy_id.clone();
    let mut subscription = state.service.subscribe(identity);

    loop {
        tokio::select! {
            next = subscription.next() => {
                let Some(snapshot) = next else { break };
                send_snapshot(&mut sender, &snapshot, send_timeout).await?;
                tracing::debug!(
                    proxy_id = %proxy_id,
                    version = snapshot.version,
                    "Sent config to proxy"
                );
            }
            incoming = receiver.next() => match incoming {
                None | Some(Ok(Message::Close(_))) => {
                    tracing::debug!(proxy_id = %proxy_id, "Peer closed config stream");
                    break;
                }
                Some(Err(e)) => {
                    tracing::debug!(
                        proxy_id = %proxy_id,
                        error = %e,
                        "Config stream read failed, treating as disconnect"
                    );
                    break;
                }
                Some(Ok(_)) => {}
            },
            _ = shutdown.recv() => {
                let close = Message::Close(Some(CloseFrame {
                    code: close_code::AWAY,
                    reason: "server shutting down".into(),
                }));
                let _ = tokio::time::timeout(send_timeout, sender.send(close)).await;
                break;
            }
        }
    }

    Ok(())
}

async fn send_snapshot(
    sender: &mut SplitSink<WebSocket, Message>,
    snapshot: &ConfigSnapshot,
    limit: Duration,
) -> Result<(), StreamError> {
    let payload = serde_json::to_string(snapshot)?;
    match tokio::time::timeout(limit, sender.send(Message::Text(payload.into()))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(StreamError::Transport(e)),
        Err(_) => Err(StreamError::Timeout(limit.as_millis() as u64)),
    }
}
