use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use vista_core::{EventHandler, EventName};
use vista_transport::Connection;

/// Where a tracked handler currently lives. The connection is held weakly:
/// when the transport replaces the instance and drops the old one, the
/// stale binding unbinds to nothing instead of keeping the dead connection
/// alive.
struct Binding {
    conn: Weak<Connection>,
}

/// Owns the set of named-event handlers bound to the live connection for
/// one view.
///
/// Invariant: at most one handler per event name is live at any time.
/// Rebinding removes the previous handler from whichever connection
/// instance it was registered on before adding the new one, even when only
/// the handler closure changed. All transport-absence cases degrade to
/// no-ops; the reconnection guard rebinds on the next connect notification.
pub struct SubscriptionRegistry {
    bound: Mutex<HashMap<EventName, Binding>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            bound: Mutex::new(HashMap::new()),
        }
    }

    /// Register `handler` for `name` on `conn`, removing any previously
    /// tracked handler for that name first.
    pub fn bind(&self, conn: &Arc<Connection>, name: EventName, handler: EventHandler) {
        let mut bound = self.bound.lock();
        if let Some(prev) = bound.remove(&name) {
            if let Some(old) = prev.conn.upgrade() {
                old.off(&name);
            }
        }
        conn.on(name.clone(), handler);
        bound.insert(
            name,
            Binding {
                conn: Arc::downgrade(conn),
            },
        );
    }

    /// Remove every tracked handler from its connection. Bindings whose
    /// connection instance is already gone are simply forgotten.
    pub fn unbind_all(&self) {
        let mut bound = self.bound.lock();
        for (name, binding) in bound.drain() {
            if let Some(conn) = binding.conn.upgrade() {
                conn.off(&name);
            }
        }
    }

    pub fn is_bound(&self, name: &EventName) -> bool {
        self.bound.lock().contains_key(name)
    }

    /// Number of tracked bindings.
    pub fn count(&self) -> usize {
        self.bound.lock().len()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
