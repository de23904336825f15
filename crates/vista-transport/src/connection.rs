use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use vista_core::{ConnectionId, DomainEvent, EventHandler, EventName};

/// One live transport session.
///
/// Instances are replaced wholesale on reconnect, never mutated in place:
/// a reconnect mints a fresh `Connection` with a fresh `ConnectionId`, and
/// handlers left on the old instance are dead weight until unbound. The
/// handler table is keyed by event name, so the transport itself enforces
/// at most one handler per name on a given instance.
pub struct Connection {
    id: ConnectionId,
    handlers: DashMap<EventName, EventHandler>,
    open: AtomicBool,
}

impl Connection {
    pub(crate) fn new() -> Self {
        Self {
            id: ConnectionId::new(),
            handlers: DashMap::new(),
            open: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::Relaxed);
    }

    /// Register a handler for an event name. Replaces any existing handler
    /// for that name.
    pub fn on(&self, name: EventName, handler: EventHandler) {
        self.handlers.insert(name, handler);
    }

    /// Remove the handler for an event name. Returns false when nothing
    /// was registered under that name.
    pub fn off(&self, name: &EventName) -> bool {
        self.handlers.remove(name).is_some()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Deliver an event to its registered handler, if any. Handlers run
    /// inline on the caller's task, so delivery order is arrival order.
    pub fn emit(&self, event: DomainEvent) -> bool {
        let handler = self.handlers.get(&event.name).map(|h| h.clone());
        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }
}
