//! Shutdown coordination.

use tokio::sync::broadcast;

/// Broadcasts a single shutdown event to the server and any background task.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Subscribers that already exited are ignored.
    pub fn trigger(&self) {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::debug!(subscribers = notified, "Shutdown triggered");
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
