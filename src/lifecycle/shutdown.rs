//! Shutdown coordination for the control plane.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Cloning shares the same signal. Every long-lived task (the HTTP server,
/// each subscribe stream, the config applier) holds its own receiver.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_all_clones() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.clone().subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }
}
