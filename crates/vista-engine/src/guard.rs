use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use vista_core::{EventHandler, EventName};
use vista_transport::{Connection, ConnectionProvider};

/// Binding status of the guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    /// Initial, and after teardown.
    Unbound,
    /// Handlers attached to a live connection instance.
    Bound,
}

struct GuardInner {
    provider: Arc<ConnectionProvider>,
    registry: Arc<super::SubscriptionRegistry>,
    bindings: Mutex<Vec<(EventName, EventHandler)>>,
    state: Mutex<GuardState>,
    rebinds: AtomicU64,
}

impl GuardInner {
    /// Tear down stale bindings and attach every watched handler to the
    /// given instance. Runs exactly once per connect notification.
    fn rebind(&self, conn: &Arc<Connection>) {
        self.registry.unbind_all();
        let bindings = self.bindings.lock().clone();
        for (name, handler) in bindings {
            self.registry.bind(conn, name, handler);
        }
        *self.state.lock() = GuardState::Bound;
        self.rebinds.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(conn = %conn.id(), handlers = self.registry.count(), "subscriptions rebound");
    }
}

/// Observes the connection lifecycle and re-runs subscription setup once
/// per new connection instance, tearing down stale bindings first.
///
/// Binding once at mount either leaks handlers (duplicate fan-out after
/// every reconnect) or loses them (missed events), because network blips
/// replace the connection object rather than handing it off. The guard
/// ties rebinding to the connect notification instead. Transport
/// disconnect alone does not unbind: handlers stay on the dead instance
/// and the next notification restores correctness.
pub struct ReconnectionGuard {
    inner: Arc<GuardInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectionGuard {
    pub fn new(provider: Arc<ConnectionProvider>, registry: Arc<super::SubscriptionRegistry>) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                provider,
                registry,
                bindings: Mutex::new(Vec::new()),
                state: Mutex::new(GuardState::Unbound),
                rebinds: AtomicU64::new(0),
            }),
            task: Mutex::new(None),
        }
    }

    /// Add an event name to the watched set. Call before `start`.
    pub fn watch(&self, name: impl Into<EventName>, handler: EventHandler) {
        self.inner.bindings.lock().push((name.into(), handler));
    }

    /// Bind to the current connection (if any) and begin following connect
    /// notifications. Subsequent calls are no-ops.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        // Subscribe before the eager bind so a connect landing in between
        // is never missed; a duplicate rebind of the same instance is
        // idempotent.
        let mut rx = self.inner.provider.subscribe_connected();
        if let Some(conn) = self.inner.provider.current() {
            self.inner.rebind(&conn);
        }

        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(conn) => inner.rebind(&conn),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Only the newest instance matters.
                        tracing::warn!(skipped = n, "connect notifications lagged, rebinding to current");
                        if let Some(conn) = inner.provider.current() {
                            inner.rebind(&conn);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Component teardown: stop following notifications and remove every
    /// handler. Safe when the transport is already gone.
    pub fn teardown(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
        self.inner.registry.unbind_all();
        *self.inner.state.lock() = GuardState::Unbound;
    }

    pub fn state(&self) -> GuardState {
        *self.inner.state.lock()
    }

    /// Number of rebinds performed since start (one per connect seen).
    pub fn rebind_count(&self) -> u64 {
        self.inner.rebinds.load(Ordering::Relaxed)
    }
}
