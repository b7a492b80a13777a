//! Events sent to the model and to the system under test.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A concrete event: a type tag plus an optional payload.
///
/// Serializes flat, as `{"type": "SUBMIT", "value": "hello"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type
    #[serde(rename = "type")]
    pub event_type: String,
    /// Properties besides `type`
    #[serde(flatten)]
    pub payload: BTreeMap<String, Value>,
}

impl Event {
    /// Create a bare event carrying only its type.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: BTreeMap::new(),
        }
    }

    /// Add a payload property. A `type` key is ignored.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "type" {
            self.payload.insert(key, value.into());
        }
        self
    }

    /// Build an event from a type and a payload map.
    ///
    /// A string `type` entry in the payload replaces `event_type`; any other
    /// `type` entry is dropped.
    #[must_use]
    pub fn from_payload(event_type: impl Into<String>, mut payload: BTreeMap<String, Value>) -> Self {
        let event_type = match payload.remove("type") {
            Some(Value::String(overridden)) => overridden,
            _ => event_type.into(),
        };
        Self {
            event_type,
            payload,
        }
    }

    /// Whether the event carries anything besides its type.
    #[must_use]
    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }

    /// Look up a payload property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Stable textual form used as an adjacency key and in traces.
    #[must_use]
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"type\":\"{}\"}}", self.event_type))
    }

    /// The description fragment used in path descriptions: `TYPE` or `TYPE ({...})`.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.has_payload() {
            let props = serde_json::to_string(&self.payload).unwrap_or_default();
            format!("{} ({})", self.event_type, props)
        } else {
            self.event_type.clone()
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl From<&str> for Event {
    fn from(event_type: &str) -> Self {
        Self::new(event_type)
    }
}

impl From<String> for Event {
    fn from(event_type: String) -> Self {
        Self::new(event_type)
    }
}
