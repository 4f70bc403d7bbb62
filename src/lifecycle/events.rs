//! Server lifecycle events.
//!
//! Test harnesses and dev tooling subscribe to learn when the server is
//! ready and which base path it serves under.

use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Base path the app is mounted under (`""` at the root).
    BasePath(String),
    /// The listener is accepting requests.
    Ready { address: String },
}

#[derive(Debug, Clone)]
pub struct ServerEvents {
    tx: broadcast::Sender<ServerEvent>,
}

impl ServerEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ServerEvent) {
        tracing::debug!(event = ?event, "Server event");
        let _ = self.tx.send(event);
    }
}

impl Default for ServerEvents {
    fn default() -> Self {
        Self::new()
    }
}
