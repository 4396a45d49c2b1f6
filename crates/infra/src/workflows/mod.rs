//! Workflow orchestration.
//!
//! Each workflow drives one lifecycle through the same four steps: validate
//! the input, authorize the caller against the access policy, execute exactly
//! one atomic store operation, then emit one audit event. The store operation
//! is the only point where state changes; the audit emit happens after the
//! change committed and never fails the call.

pub mod assignment;
pub mod metrics;
pub mod purchase;
pub mod transfer;

pub use assignment::AssignmentWorkflow;
pub use metrics::{MetricsAggregator, MetricsQuery};
pub use purchase::PurchaseWorkflow;
pub use transfer::TransferWorkflow;

use quartermaster_audit::{AuditEvent, AuditSink};

/// Hand an event to the audit sink, logging instead of failing: the mutation
/// already committed, so the caller's result must not change.
pub(crate) fn emit_audit<A: AuditSink>(audit: &A, event: AuditEvent) {
    if let Err(e) = audit.record(event) {
        tracing::warn!(error = %e, "audit sink rejected event");
    }
}

/// Serialize a committed record into an audit payload.
pub(crate) fn audit_payload<T: serde::Serialize>(record: &T) -> serde_json::Value {
    serde_json::to_value(record).unwrap_or(serde_json::Value::Null)
}
