//! # Audit Sink
//!
//! Operational events the store reports to an outside collaborator: sales
//! recorded or rejected, stock clamped at zero, collections reset.
//!
//! ```text
//! ┌──────────────┐   AuditEvent    ┌─────────────────────────────┐
//! │  StoreTx     │ ──(on commit)──►│  dyn AuditSink              │
//! │  SaleService │ ──(on failure)─►│  ├── TracingSink (default)  │
//! └──────────────┘                 │  └── NoopSink               │
//!                                  └─────────────────────────────┘
//! ```
//!
//! Events queued inside a write unit are only delivered once it commits.
//! The store behaves the same whichever sink is installed.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// One reported event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    /// Coarse area: `sale`, `stock`, `store`.
    pub category: &'static str,
    pub operation: &'static str,
    pub data: Value,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(category: &'static str, operation: &'static str, data: Value) -> Self {
        AuditEvent {
            category,
            operation,
            data,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Receiver for audit events. Every method has a no-op default.
pub trait AuditSink: Send + Sync + 'static {
    fn record(&self, _event: &AuditEvent) {}
}

/// Forwards events to `tracing` under the `till::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, event: &AuditEvent) {
        match &event.error {
            Some(error) => warn!(
                target: "till::audit",
                category = event.category,
                operation = event.operation,
                data = %event.data,
                error = %error,
                "Operation failed"
            ),
            None => info!(
                target: "till::audit",
                category = event.category,
                operation = event.operation,
                data = %event.data,
                "Operation recorded"
            ),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl AuditSink for NoopSink {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let event = AuditEvent::new("sale", "create_sale", json!({ "id": 1 })).with_error("boom");
        assert_eq!(event.error.as_deref(), Some("boom"));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["category"], "sale");
        assert_eq!(value["data"]["id"], 1);
    }

    #[test]
    fn test_default_sinks_accept_events() {
        let event = AuditEvent::new("store", "clear_all", Value::Null);
        TracingSink.record(&event);
        NoopSink.record(&event);
    }
}
