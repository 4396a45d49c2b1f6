//! `quartermaster-audit` — audit trail interface.
//!
//! Every successful mutation emits exactly one [`AuditEvent`] through an
//! [`AuditSink`], synchronously after commit. Durable storage of the trail
//! is an external concern; the sinks here buffer (tests, dev) or forward to
//! the structured log.

pub mod event;
pub mod in_memory;
pub mod sink;
pub mod tracing_sink;

pub use event::{AuditAction, AuditEvent};
pub use in_memory::InMemoryAuditSink;
pub use sink::{AuditSink, SinkError};
pub use tracing_sink::TracingAuditSink;
