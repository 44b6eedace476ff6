//! Long-running config subscriber for a data-plane proxy.
//!
//! # Responsibilities
//! - Register, then hold a config stream open
//! - Publish each received snapshot for lock-free reads
//! - Reconnect with exponential backoff when the stream ends or fails
//!
//! # Design Decisions
//! - The latest snapshot lives in an `ArcSwapOption` so request paths
//!   never wait on the stream task
//! - Backoff resets once a snapshot arrives on a new stream

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::{broadcast, watch};

use crate::client::api::ControlClient;
use crate::client::backoff::Backoff;
use crate::client::error::ClientResult;
use crate::control::{ConfigSnapshot, ProxyIdentity, Route};

const DEFAULT_BACKOFF_BASE_MS: u64 = 100;
const DEFAULT_BACKOFF_MAX_MS: u64 = 10_000;

/// Read side of a running subscriber. Cheap to clone.
#[derive(Clone)]
pub struct ConfigHandle {
    latest: Arc<ArcSwapOption<ConfigSnapshot>>,
    versions: watch::Receiver<i64>,
}

impl ConfigHandle {
    /// Most recently received snapshot, if any.
    pub fn latest(&self) -> Option<Arc<ConfigSnapshot>> {
        self.latest.load_full()
    }

    pub fn resolve(&self, path: &str) -> Option<Route> {
        self.latest().and_then(|snapshot| snapshot.resolve(path).cloned())
    }

    /// Wait until a snapshot with version >= `min` has been received.
    ///
    /// Returns `None` if the subscriber stopped first.
    pub async fn wait_for_version(&mut self, min: i64) -> Option<i64> {
        self.versions.wait_for(|v| *v >= min).await.ok().map(|v| *v)
    }
}

pub struct ConfigSubscriber {
    client: ControlClient,
    identity: ProxyIdentity,
    latest: Arc<ArcSwapOption<ConfigSnapshot>>,
    versions: watch::Sender<i64>,
    backoff: Backoff,
}

impl ConfigSubscriber {
    pub fn new(client: ControlClient, identity: ProxyIdentity) -> Self {
        let (versions, _) = watch::channel(0);
        Self {
            client,
            identity,
            latest: Arc::new(ArcSwapOption::empty()),
            versions,
            backoff: Backoff::new(DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_MAX_MS),
        }
    }

    pub fn with_backoff(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.backoff = Backoff::new(base_ms, max_ms);
        self
    }

    pub fn handle(&self) -> ConfigHandle {
        ConfigHandle {
            latest: Arc::clone(&self.latest),
            versions: self.versions.subscribe(),
        }
    }

    pub fn latest(&self) -> Option<Arc<ConfigSnapshot>> {
        self.latest.load_full()
    }

    /// Stream until `shutdown` fires, reconnecting as needed.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                result = Self::session(&self.client, &self.identity, &self.latest, &self.versions, &mut self.backoff) => {
                    match result {
                        Ok(()) => tracing::info!(proxy_id = %self.identity.proxy_id, "Config stream ended"),
                        Err(e) => tracing::warn!(
                            proxy_id = %self.identity.proxy_id,
                            error = %e,
                            "Config stream failed"
                        ),
                    }
                }
                _ = shutdown.recv() => break,
            }

            let delay = self.backoff.next_delay();
            tracing::debug!(
                attempt = self.backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to control plane"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!(proxy_id = %self.identity.proxy_id, "Config subscriber stopped");
    }

    async fn session(
        client: &ControlClient,
        identity: &ProxyIdentity,
        latest: &ArcSwapOption<ConfigSnapshot>,
        versions: &watch::Sender<i64>,
        backoff: &mut Backoff,
    ) -> ClientResult<()> {
        client.register(identity).await?;
        let mut stream = client.subscribe(identity).await?;

        while let Some(snapshot) = stream.next().await {
            let snapshot = snapshot?;
            backoff.reset();
            tracing::info!(
                version = snapshot.version,
                routes = snapshot.routes.len(),
                "Applied config from control plane"
            );
            let version = snapshot.version;
            latest.store(Some(Arc::new(snapshot)));
            versions.send_replace(version);
        }

        Ok(())
    }
}
