//! Live membership of connected proxies.
//!
//! # Responsibilities
//! - Map `proxy_id` to the latest `ProxyEntry` (last write wins)
//! - Hand out point-in-time copies of all entries for fan-out
//! - Let a subscribe session remove its own entry, and only its own
//!
//! # Design Decisions
//! - `ConfigSink` wraps a `WeakSender`: the registry can enqueue but can
//!   never keep a connection's queue alive or close it
//! - Every put stamps a fresh `SessionId`; session-scoped removal ignores
//!   entries that were replaced after the session started
//! - `snapshot()` clones entries out so sends happen with no lock held

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::control::error::PushError;
use crate::control::types::{ConfigSnapshot, ProxyIdentity};
use crate::observability::metrics;

static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one registration or subscription of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Non-owning handle to a subscribe session's outbound queue.
#[derive(Debug, Clone)]
pub struct ConfigSink {
    tx: mpsc::WeakSender<Arc<ConfigSnapshot>>,
}

impl ConfigSink {
    /// Wrap a weak handle to a session's queue.
    pub fn new(tx: mpsc::WeakSender<Arc<ConfigSnapshot>>) -> Self {
        Self { tx }
    }

    /// Enqueue a snapshot without waiting.
    pub fn push(&self, snapshot: Arc<ConfigSnapshot>) -> Result<(), PushError> {
        let tx = self.tx.upgrade().ok_or(PushError::Closed)?;
        tx.try_send(snapshot).map_err(|e| match e {
            TrySendError::Full(_) => PushError::Full,
            TrySendError::Closed(_) => PushError::Closed,
        })
    }

    /// True once the owning session has dropped its queue.
    pub fn is_closed(&self) -> bool {
        self.tx.upgrade().is_none()
    }
}

/// A registry record for one proxy.
#[derive(Debug, Clone)]
pub struct ProxyEntry {
    pub identity: ProxyIdentity,
    /// Present only while a subscribe session is open.
    pub sink: Option<ConfigSink>,
    pub session: SessionId,
}

/// Outcome of an operator eviction.
#[derive(Debug)]
pub enum Eviction {
    Removed(ProxyEntry),
    /// The entry belongs to an open subscription and was left in place.
    Subscribed,
    Missing,
}

/// Table of connected proxies keyed by `proxy_id`.
#[derive(Debug, Default)]
pub struct ProxyRegistry {
    entries: DashMap<String, ProxyEntry>,
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `identity.proxy_id`.
    ///
    /// A replaced entry's sink is simply dropped from the table; closing the
    /// underlying connection stays with the session that owns it.
    pub fn put(&self, identity: ProxyIdentity, sink: Option<ConfigSink>) -> SessionId {
        let session = SessionId::new();
        let key = identity.proxy_id.clone();
        let entry = ProxyEntry {
            identity,
            sink,
            session,
        };

        if let Some(previous) = self.entries.insert(key, entry) {
            tracing::debug!(
                proxy_id = %previous.identity.proxy_id,
                replaced = %previous.session,
                session = %session,
                "Registry entry replaced"
            );
        }
        metrics::record_registry_size(self.entries.len());
        session
    }

    /// Delete a registration-only entry.
    ///
    /// Entries holding a sink are owned by their subscribe session and are
    /// only ever removed when that session ends.
    pub fn evict_unsubscribed(&self, proxy_id: &str) -> Eviction {
        if let Some((_, entry)) = self.entries.remove_if(proxy_id, |_, e| e.sink.is_none()) {
            metrics::record_registry_size(self.entries.len());
            return Eviction::Removed(entry);
        }
        if self.entries.contains_key(proxy_id) {
            Eviction::Subscribed
        } else {
            Eviction::Missing
        }
    }

    /// Delete the entry for `proxy_id` only if it still belongs to `session`.
    pub fn remove_session(&self, proxy_id: &str, session: SessionId) -> bool {
        let removed = self
            .entries
            .remove_if(proxy_id, |_, entry| entry.session == session)
            .is_some();
        metrics::record_registry_size(self.entries.len());
        removed
    }

    /// Copy of every entry, safe to iterate while the registry changes.
    pub fn snapshot(&self) -> Vec<ProxyEntry> {
        self.entries.iter().map(|r| r.value().clone()).collect()
    }

    /// Identities of every registered proxy, sinks dropped.
    pub fn list_identities(&self) -> Vec<ProxyIdentity> {
        self.entries
            .iter()
            .map(|r| r.value().identity.clone())
            .collect()
    }

    pub fn get(&self, proxy_id: &str) -> Option<ProxyEntry> {
        self.entries.get(proxy_id).map(|r| r.value().clone())
    }

    pub fn contains(&self, proxy_id: &str) -> bool {
        self.entries.contains_key(proxy_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries holding a sink.
    pub fn subscribed_count(&self) -> usize {
        self.entries.iter().filter(|r| r.value().sink.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str) -> ProxyIdentity {
        ProxyIdentity::new(id, "0.1.0", "127.0.0.1:8080")
    }

    #[test]
    fn test_session_id_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_put_replaces_entry() {
        let registry = ProxyRegistry::new();
        let first = registry.put(identity("p1"), None);

        let (tx, _rx) = mpsc::channel(4);
        let second = registry.put(identity("p1"), Some(ConfigSink::new(tx.downgrade())));

        assert_ne!(first, second);
        assert_eq!(registry.len(), 1);
        let entry = registry.get("p1").unwrap();
        assert_eq!(entry.session, second);
        assert!(entry.sink.is_some());
    }

    #[test]
    fn test_evict_leaves_subscribed_entry() {
        let registry = ProxyRegistry::new();
        registry.put(identity("idle"), None);
        let (tx, _rx) = mpsc::channel(4);
        registry.put(identity("live"), Some(ConfigSink::new(tx.downgrade())));

        assert!(matches!(registry.evict_unsubscribed("idle"), Eviction::Removed(_)));
        assert!(matches!(registry.evict_unsubscribed("idle"), Eviction::Missing));
        assert!(matches!(registry.evict_unsubscribed("live"), Eviction::Subscribed));
        assert!(registry.get("live").unwrap().sink.is_some());
    }

    #[test]
    fn test_remove_session_ignores_replaced_entry() {
        let registry = ProxyRegistry::new();
        let stale = registry.put(identity("p1"), None);
        let current = registry.put(identity("p1"), None);

        assert!(!registry.remove_session("p1", stale));
        assert!(registry.contains("p1"));

        assert!(registry.remove_session("p1", current));
        assert!(!registry.contains("p1"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = ProxyRegistry::new();
        registry.put(identity("p1"), None);
        registry.put(identity("p2"), None);

        let snapshot = registry.snapshot();
        registry.evict_unsubscribed("p1");
        registry.put(identity("p3"), None);

        assert_eq!(snapshot.len(), 2);
        let mut ids: Vec<_> = registry.list_identities().into_iter().map(|i| i.proxy_id).collect();
        ids.sort();
        assert_eq!(ids, vec!["p2", "p3"]);
    }

    #[test]
    fn test_sink_push_outcomes() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = ConfigSink::new(tx.downgrade());
        let snapshot = Arc::new(ConfigSnapshot::new(1, Vec::new()));

        assert_eq!(sink.push(Arc::clone(&snapshot)), Ok(()));
        assert_eq!(sink.push(Arc::clone(&snapshot)), Err(PushError::Full));
        assert_eq!(rx.try_recv().unwrap().version, 1);

        drop(tx);
        assert!(sink.is_closed());
        assert_eq!(sink.push(snapshot), Err(PushError::Closed));
    }

    #[test]
    fn test_registry_does_not_keep_queue_alive() {
        let registry = ProxyRegistry::new();
        let (tx, mut rx) = mpsc::channel::<Arc<ConfigSnapshot>>(4);
        registry.put(identity("p1"), Some(ConfigSink::new(tx.downgrade())));

        drop(tx);
        // Only the weak handle remains, so the receiver observes closure.
        assert!(rx.try_recv().is_err());
        assert!(registry.get("p1").unwrap().sink.unwrap().is_closed());
    }
}
