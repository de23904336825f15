use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of a server-pushed event, e.g. "catalog-changed".
///
/// The set of names is open and caller-supplied; the coordinator treats
/// every qualifying name identically. Used as the handler key on a
/// connection, so at most one handler per name can be live at a time.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventName(String);

impl EventName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An event delivered by the transport. The payload is opaque here; only
/// a consumer's merge step ever looks inside it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainEvent {
    pub name: EventName,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(name: impl Into<EventName>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Handler bound to an event name on a live connection.
pub type EventHandler = Arc<dyn Fn(DomainEvent) + Send + Sync>;
