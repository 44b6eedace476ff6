//! Proxy-facing orchestration over the store and the registry.
//!
//! # Responsibilities
//! - Record registrations
//! - Open subscribe sessions: publish a sink, yield the current snapshot
//!   first, then every broadcast in the order it was enqueued
//! - Fan a snapshot out to every subscribed proxy
//!
//! # Session Lifecycle
//! ```text
//! subscribe() ─▶ Connecting (entry + sink published)
//!            ─▶ InitialPush (current snapshot yielded first)
//!            ─▶ Listening (queued broadcasts yielded as they arrive)
//!            ─▶ Terminating (Subscription dropped: entry removed once)
//! ```
//!
//! # Design Decisions
//! - Cleanup lives in `Drop`, so it runs on every exit path of the owner
//! - The session keeps the only strong sender; the registry holds a weak one
//! - A failed push is reported, never used to evict the entry
//! - `publish_lock` orders every publication (commit + fan-out, and the
//!   subscribe handshake) so queues fill in version order; it is never
//!   held while waiting on a peer
//! - A session never yields a version older than the last one it yielded

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::control::error::PushError;
use crate::control::registry::{ConfigSink, ProxyRegistry, SessionId};
use crate::control::store::ConfigStore;
use crate::control::types::{ConfigSnapshot, ProxyIdentity, RegistrationResult, Route};
use crate::observability::metrics;

/// Default depth of each session's outbound queue.
pub const DEFAULT_SINK_CAPACITY: usize = 16;

/// Outcome of a single broadcast call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastReport {
    pub version: i64,
    /// Proxies whose queue accepted the snapshot.
    pub delivered: Vec<String>,
    /// Proxies whose queue refused it.
    pub failed: Vec<DeliveryFailure>,
    /// Registered proxies without an open subscription.
    pub skipped: usize,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFailure {
    pub proxy_id: String,
    pub reason: PushError,
}

/// The control-plane service composed of a `ConfigStore` and a `ProxyRegistry`.
#[derive(Debug)]
pub struct ControlService {
    store: Arc<ConfigStore>,
    registry: Arc<ProxyRegistry>,
    sink_capacity: usize,
    publish_lock: Mutex<()>,
}

impl ControlService {
    /// Create a service over an existing store and registry.
    pub fn new(store: Arc<ConfigStore>, registry: Arc<ProxyRegistry>, sink_capacity: usize) -> Self {
        Self {
            store,
            registry,
            sink_capacity: sink_capacity.max(1),
            publish_lock: Mutex::new(()),
        }
    }

    /// Service over a fresh store seeded with `routes` and an empty registry.
    pub fn with_routes(routes: Vec<Route>, sink_capacity: usize) -> Self {
        Self::new(
            Arc::new(ConfigStore::new(routes)),
            Arc::new(ProxyRegistry::new()),
            sink_capacity,
        )
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ProxyRegistry> {
        &self.registry
    }

    /// Record a proxy's identity without a push channel.
    pub fn register_proxy(&self, identity: ProxyIdentity) -> RegistrationResult {
        tracing::info!(
            proxy_id = %identity.proxy_id,
            version = %identity.version,
            listen_addr = %identity.listen_addr,
            "Proxy registering"
        );
        if identity.proxy_id.is_empty() {
            tracing::warn!("Proxy registered with an empty proxy_id");
        }

        let message = format!("Proxy {} registered successfully", identity.proxy_id);
        self.registry.put(identity, None);
        metrics::record_registration();

        RegistrationResult {
            success: true,
            message,
        }
    }

    /// Open a subscribe session for `identity`.
    ///
    /// The entry is published and the current snapshot read under the
    /// publish lock, so every later mutation is queued behind the initial
    /// snapshot and no earlier one is queued at all.
    pub fn subscribe(&self, identity: ProxyIdentity) -> Subscription {
        let (tx, rx) = mpsc::channel(self.sink_capacity);
        let sink = ConfigSink::new(tx.downgrade());

        let (session, initial) = {
            let _publish = self.publish();
            let session = self.registry.put(identity.clone(), Some(sink));
            (session, self.store.snapshot())
        };
        metrics::record_subscription_opened();

        tracing::info!(
            proxy_id = %identity.proxy_id,
            session = %session,
            version = initial.version,
            num_routes = initial.routes.len(),
            "Proxy subscribed, sending initial config"
        );

        Subscription {
            initial: Some(initial),
            last_version: None,
            rx,
            _tx: tx,
            guard: SessionGuard {
                registry: Arc::clone(&self.registry),
                identity,
                session,
                opened: Instant::now(),
            },
        }
    }

    /// Push `snapshot` to every proxy with an open subscription.
    ///
    /// Never waits on a peer. Per-target failures are logged and reported;
    /// they do not stop delivery to the others or remove any entry.
    pub fn broadcast(&self, snapshot: Arc<ConfigSnapshot>) -> BroadcastReport {
        let _publish = self.publish();
        self.fan_out(snapshot)
    }

    fn fan_out(&self, snapshot: Arc<ConfigSnapshot>) -> BroadcastReport {
        let entries = self.registry.snapshot();
        metrics::record_broadcast();
        tracing::info!(
            version = snapshot.version,
            proxy_count = entries.len(),
            "Broadcasting config update"
        );

        let mut report = BroadcastReport {
            version: snapshot.version,
            ..Default::default()
        };

        for entry in entries {
            let Some(sink) = entry.sink else {
                report.skipped += 1;
                continue;
            };
            let proxy_id = entry.identity.proxy_id;

            match sink.push(Arc::clone(&snapshot)) {
                Ok(()) => {
                    metrics::record_push("delivered");
                    tracing::debug!(proxy_id = %proxy_id, version = snapshot.version, "Config update queued");
                    report.delivered.push(proxy_id);
                }
                Err(reason) => {
                    metrics::record_push(reason.as_str());
                    tracing::error!(
                        proxy_id = %proxy_id,
                        session = %entry.session,
                        error = %reason,
                        "Failed to send config update to proxy"
                    );
                    report.failed.push(DeliveryFailure { proxy_id, reason });
                }
            }
        }

        report
    }

    /// Identities of every registered or subscribed proxy.
    pub fn connected_proxies(&self) -> Vec<ProxyIdentity> {
        self.registry.list_identities()
    }

    /// Replace the route table and broadcast the result.
    ///
    /// Commit and fan-out happen under one publish lock, so concurrent
    /// mutations reach every queue in version order.
    pub fn replace_and_broadcast(&self, routes: Vec<Route>) -> (Arc<ConfigSnapshot>, BroadcastReport) {
        let _publish = self.publish();
        let snapshot = self.store.replace_routes(routes);
        let report = self.fan_out(Arc::clone(&snapshot));
        (snapshot, report)
    }

    /// Append a route and broadcast the result.
    pub fn append_and_broadcast(&self, route: Route) -> (Arc<ConfigSnapshot>, BroadcastReport) {
        let _publish = self.publish();
        let snapshot = self.store.append_route(route);
        let report = self.fan_out(Arc::clone(&snapshot));
        (snapshot, report)
    }

    fn publish(&self) -> MutexGuard<'_, ()> {
        // Guards `()`, so a poisoned lock carries no broken state.
        self.publish_lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ControlService {
    fn default() -> Self {
        Self::with_routes(vec![Route::default_route()], DEFAULT_SINK_CAPACITY)
    }
}

/// An open subscribe session.
///
/// Yields the initial snapshot, then broadcasts. Dropping it ends the
/// session and removes the proxy's entry unless it was replaced meanwhile.
#[derive(Debug)]
pub struct Subscription {
    initial: Option<Arc<ConfigSnapshot>>,
    last_version: Option<i64>,
    rx: mpsc::Receiver<Arc<ConfigSnapshot>>,
    // Held so `next` parks instead of returning `None` while idle.
    _tx: mpsc::Sender<Arc<ConfigSnapshot>>,
    guard: SessionGuard,
}

impl Subscription {
    /// Next snapshot to deliver. Cancel-safe.
    ///
    /// Snapshots older than the last one yielded are dropped; an equal
    /// version is a deliberate re-push and passes through.
    pub async fn next(&mut self) -> Option<Arc<ConfigSnapshot>> {
        if let Some(initial) = self.initial.take() {
            self.last_version = Some(initial.version);
            return Some(initial);
        }
        loop {
            let snapshot = self.rx.recv().await?;
            match self.last_version {
                Some(last) if snapshot.version < last => {
                    tracing::debug!(
                        proxy_id = %self.guard.identity.proxy_id,
                        version = snapshot.version,
                        last,
                        "Skipping stale config"
                    );
                }
                _ => {
                    self.last_version = Some(snapshot.version);
                    return Some(snapshot);
                }
            }
        }
    }

    pub fn identity(&self) -> &ProxyIdentity {
        &self.guard.identity
    }

    pub fn session(&self) -> SessionId {
        self.guard.session
    }
}

#[derive(Debug)]
struct SessionGuard {
    registry: Arc<ProxyRegistry>,
    identity: ProxyIdentity,
    session: SessionId,
    opened: Instant,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let removed = self
            .registry
            .remove_session(&self.identity.proxy_id, self.session);
        metrics::record_subscription_closed();
        tracing::info!(
            proxy_id = %self.identity.proxy_id,
            session = %self.session,
            removed,
            connected_ms = self.opened.elapsed().as_millis() as u64,
            "Proxy disconnected"
        );
    }
}
