use std::sync::RwLock;

use crate::{AuditEvent, AuditSink, SinkError};

/// Buffering sink for tests and development.
///
/// Events are appended in call order under a write lock; `events()` hands
/// back a snapshot so assertions never hold the lock.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, in call order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), SinkError> {
        let mut events = self
            .events
            .write()
            .map_err(|_| SinkError("lock poisoned".to_string()))?;
        events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditAction;
    use quartermaster_core::UserId;
    use uuid::Uuid;

    fn event(action: AuditAction) -> AuditEvent {
        AuditEvent::new(UserId::new(), action, Uuid::now_v7(), serde_json::json!({}))
    }

    #[test]
    fn records_events_in_call_order() {
        let sink = InMemoryAuditSink::new();
        sink.record(event(AuditAction::CreatePurchase)).unwrap();
        sink.record(event(AuditAction::CreateTransfer)).unwrap();
        sink.record(event(AuditAction::ApproveTransfer)).unwrap();

        let actions: Vec<_> = sink.events().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::CreatePurchase,
                AuditAction::CreateTransfer,
                AuditAction::ApproveTransfer,
            ]
        );
    }

    #[test]
    fn clear_empties_the_buffer() {
        let sink = InMemoryAuditSink::new();
        sink.record(event(AuditAction::ReturnAsset)).unwrap();
        sink.clear();
        assert!(sink.events().is_empty());
    }
}
