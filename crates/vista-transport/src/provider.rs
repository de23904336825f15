use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use vista_core::DomainEvent;

use crate::connection::Connection;

const CONNECT_CHANNEL_CAPACITY: usize = 16;

/// Injected connection provider with an explicit lifecycle.
///
/// Replaces the ambient module-level socket singleton: views receive an
/// `Arc<ConnectionProvider>` and never import transport state. `connect`
/// models both the first connection and every reconnect — a network blip
/// is `disconnect` (no notification) followed by `connect` (notified),
/// which is how real transports replace the connection object wholesale.
pub struct ConnectionProvider {
    current: RwLock<Option<Arc<Connection>>>,
    connected_tx: broadcast::Sender<Arc<Connection>>,
}

impl ConnectionProvider {
    pub fn new() -> Self {
        let (connected_tx, _) = broadcast::channel(CONNECT_CHANNEL_CAPACITY);
        Self {
            current: RwLock::new(None),
            connected_tx,
        }
    }

    /// The current live connection, if any. Borrowed per call: callers
    /// must not cache it across reconnects.
    pub fn current(&self) -> Option<Arc<Connection>> {
        self.current.read().clone()
    }

    /// Establish a fresh connection instance, replacing any previous one,
    /// and notify every connect subscriber.
    pub fn connect(&self) -> Arc<Connection> {
        let conn = Arc::new(Connection::new());
        let previous = {
            let mut current = self.current.write();
            current.replace(Arc::clone(&conn))
        };
        if let Some(old) = previous {
            old.close();
            tracing::debug!(old = %old.id(), new = %conn.id(), "connection replaced");
        } else {
            tracing::debug!(id = %conn.id(), "connection established");
        }
        // No subscribers yet is fine; the guard binds eagerly on start.
        let _ = self.connected_tx.send(Arc::clone(&conn));
        conn
    }

    /// Drop the current connection without notifying anyone. Handlers stay
    /// registered on the dead instance; the next `connect` notification is
    /// what restores correctness.
    pub fn disconnect(&self) {
        if let Some(conn) = self.current.write().take() {
            conn.close();
            tracing::debug!(id = %conn.id(), "connection dropped");
        }
    }

    /// End of the provider's lifecycle.
    pub fn teardown(&self) {
        self.disconnect();
    }

    /// Subscribe to (re)connect notifications. Each receiver sees every
    /// future connect; dropping the receiver unsubscribes.
    pub fn subscribe_connected(&self) -> broadcast::Receiver<Arc<Connection>> {
        self.connected_tx.subscribe()
    }

    /// Deliver an event to the current connection. False when the
    /// transport is down or no handler is bound for the event's name.
    pub fn emit(&self, event: DomainEvent) -> bool {
        match self.current() {
            Some(conn) => conn.emit(event),
            None => false,
        }
    }
}

impl Default for ConnectionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn starts_disconnected() {
        let provider = ConnectionProvider::new();
        assert!(provider.current().is_none());
        assert!(!provider.emit(DomainEvent::new("catalog-changed", serde_json::Value::Null)));
    }

    #[test]
    fn connect_installs_fresh_instance() {
        let provider = ConnectionProvider::new();
        let first = provider.connect();
        let second = provider.connect();

        assert_ne!(first.id(), second.id());
        assert!(!first.is_open());
        assert!(second.is_open());
        assert_eq!(provider.current().unwrap().id(), second.id());
    }

    #[test]
    fn disconnect_clears_current() {
        let provider = ConnectionProvider::new();
        let conn = provider.connect();
        provider.disconnect();

        assert!(provider.current().is_none());
        assert!(!conn.is_open());
        // Repeated disconnects are harmless.
        provider.disconnect();
        provider.teardown();
    }

    #[tokio::test]
    async fn subscribers_see_every_connect() {
        let provider = ConnectionProvider::new();
        let mut rx_a = provider.subscribe_connected();
        let mut rx_b = provider.subscribe_connected();

        let c1 = provider.connect();
        let c2 = provider.connect();

        assert_eq!(rx_a.recv().await.unwrap().id(), c1.id());
        assert_eq!(rx_a.recv().await.unwrap().id(), c2.id());
        assert_eq!(rx_b.recv().await.unwrap().id(), c1.id());
        assert_eq!(rx_b.recv().await.unwrap().id(), c2.id());
    }

    #[tokio::test]
    async fn disconnect_does_not_notify() {
        let provider = ConnectionProvider::new();
        let mut rx = provider.subscribe_connected();

        provider.connect();
        provider.disconnect();
        provider.connect();

        let _ = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(provider.current().unwrap().id(), second.id());
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn emit_reaches_current_connection() {
        let provider = ConnectionProvider::new();
        let conn = provider.connect();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        conn.on(
            "catalog-changed".into(),
            Arc::new(move |_evt| {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        );

        assert!(provider.emit(DomainEvent::new("catalog-changed", serde_json::Value::Null)));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
