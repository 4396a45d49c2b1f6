use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quartermaster_core::{AuditEventId, UserId};

/// Action vocabulary of the audit trail.
///
/// One tag per successful mutation. The serialized form is the tag itself
/// (`CREATE_PURCHASE`, ...), which downstream audit consumers key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreatePurchase,
    UpdatePurchase,
    CreateTransfer,
    ApproveTransfer,
    CancelTransfer,
    CreateAssignment,
    ReturnAsset,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreatePurchase => "CREATE_PURCHASE",
            AuditAction::UpdatePurchase => "UPDATE_PURCHASE",
            AuditAction::CreateTransfer => "CREATE_TRANSFER",
            AuditAction::ApproveTransfer => "APPROVE_TRANSFER",
            AuditAction::CancelTransfer => "CANCEL_TRANSFER",
            AuditAction::CreateAssignment => "CREATE_ASSIGNMENT",
            AuditAction::ReturnAsset => "RETURN_ASSET",
        }
    }

    /// Table the action mutated, recorded alongside the tag.
    pub fn table(&self) -> &'static str {
        match self {
            AuditAction::CreatePurchase | AuditAction::UpdatePurchase => "purchases",
            AuditAction::CreateTransfer
            | AuditAction::ApproveTransfer
            | AuditAction::CancelTransfer => "transfers",
            AuditAction::CreateAssignment | AuditAction::ReturnAsset => "assignments",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit trail entry, emitted synchronously after a committed mutation.
///
/// `payload` snapshots the record the workflow returned, so the trail and
/// the caller always describe the same state. Emit-only: nothing in this
/// system reads audit events back, so the type only serializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub actor: UserId,
    pub action: AuditAction,
    pub table: &'static str,
    pub record_id: Uuid,
    pub payload: serde_json::Value,
    pub origin: Option<IpAddr>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        actor: UserId,
        action: AuditAction,
        record_id: impl Into<Uuid>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: AuditEventId::new(),
            actor,
            action,
            table: action.table(),
            record_id: record_id.into(),
            payload,
            origin: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_origin(mut self, origin: Option<IpAddr>) -> Self {
        self.origin = origin;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_tags_serialize_in_audit_vocabulary() {
        let json = serde_json::to_string(&AuditAction::CreatePurchase).unwrap();
        assert_eq!(json, "\"CREATE_PURCHASE\"");
        let json = serde_json::to_string(&AuditAction::ReturnAsset).unwrap();
        assert_eq!(json, "\"RETURN_ASSET\"");
    }

    #[test]
    fn actions_name_the_table_they_touch() {
        assert_eq!(AuditAction::ApproveTransfer.table(), "transfers");
        assert_eq!(AuditAction::UpdatePurchase.table(), "purchases");
        assert_eq!(AuditAction::ReturnAsset.table(), "assignments");
    }

    #[test]
    fn event_snapshots_the_payload() {
        let actor = UserId::new();
        let record = Uuid::now_v7();
        let event = AuditEvent::new(
            actor,
            AuditAction::CancelTransfer,
            record,
            serde_json::json!({"status": "cancelled"}),
        );

        assert_eq!(event.actor, actor);
        assert_eq!(event.record_id, record);
        assert_eq!(event.table, "transfers");
        assert_eq!(event.payload["status"], "cancelled");
        assert_eq!(event.origin, None);
    }
}
