//! Pool event types and definitions
//!
//! This module defines the events a connection pool raises and the
//! [`Event`] trait the registry uses to route them by kind.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use uuid::Uuid;

/// An immutable value the dispatch loop can route by kind
pub trait Event: Clone + Send + Sync + 'static {
    type Kind: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// What happened inside the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolEventKind {
    InitCompleted,
    ConnectionCreated,
    Checkout,
    Checkin,
    ValidationSucceeded,
    ValidationFailed,
    MaxPoolLimitReached,
    MaxPoolLimitExceeded,
    MaxSizeLimitError,
    ParametersChanged,
    PoolReleased,
}

/// Connection pool event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolEvent {
    /// Unique event ID
    pub id: Uuid,
    pub kind: PoolEventKind,
    /// Name of the pool that raised the event
    pub pool_name: String,
    /// Additional data
    pub payload: HashMap<String, serde_json::Value>,
    /// Event timestamp (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl PoolEvent {
    pub fn new(kind: PoolEventKind, pool_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            pool_name: pool_name.into(),
            payload: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn payload_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }
}

impl Event for PoolEvent {
    type Kind = PoolEventKind;

    fn kind(&self) -> PoolEventKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_sets_payload() {
        let event = PoolEvent::new(PoolEventKind::ValidationFailed, "primary")
            .with_payload("error", "connection reset")
            .with_payload("attempt", 2);

        assert_eq!(event.kind(), PoolEventKind::ValidationFailed);
        assert_eq!(event.pool_name, "primary");
        assert_eq!(event.payload_value("error"), Some(&json!("connection reset")));
        assert_eq!(event.payload_value("attempt"), Some(&json!(2)));
        assert_eq!(event.payload_value("missing"), None);
    }

    #[test]
    fn test_events_get_distinct_ids() {
        let a = PoolEvent::new(PoolEventKind::Checkout, "primary");
        let b = PoolEvent::new(PoolEventKind::Checkout, "primary");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_event_serializes_kind_by_name() {
        let event = PoolEvent::new(PoolEventKind::PoolReleased, "replica");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], json!("PoolReleased"));
        assert_eq!(value["pool_name"], json!("replica"));
    }
}
