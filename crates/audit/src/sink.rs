use std::sync::Arc;

use thiserror::Error;

use crate::AuditEvent;

/// Failure to hand an event to the audit trail.
///
/// The mutation behind the event has already committed when the sink runs,
/// so callers log this and move on; they never roll back or fail the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("audit sink failure: {0}")]
pub struct SinkError(pub String);

/// Destination of audit events.
///
/// Durable audit storage is an external concern; implementations here either
/// buffer (tests, dev) or forward to the log stream. Implementations must be
/// safe to call from concurrent workflows.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), SinkError>;
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn record(&self, event: AuditEvent) -> Result<(), SinkError> {
        (**self).record(event)
    }
}
