use crate::{AuditEvent, AuditSink, SinkError};

/// Sink that forwards each event to the log stream on the `audit` target.
///
/// The default production sink: the external audit consumer tails the
/// structured log. Recording cannot fail.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), SinkError> {
        tracing::info!(
            target: "audit",
            actor = %event.actor,
            action = %event.action,
            table = event.table,
            record_id = %event.record_id,
            origin = ?event.origin,
            payload = %event.payload,
            "audit event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditAction;
    use quartermaster_core::UserId;
    use uuid::Uuid;

    #[test]
    fn recording_never_fails() {
        let sink = TracingAuditSink::new();
        let event = AuditEvent::new(
            UserId::new(),
            AuditAction::CreateAssignment,
            Uuid::now_v7(),
            serde_json::json!({"status": "active"}),
        );
        assert!(sink.record(event).is_ok());
    }
}
