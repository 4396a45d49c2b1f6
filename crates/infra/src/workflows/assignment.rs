use chrono::Utc;
use tracing::instrument;

use quartermaster_assignments::{Assignment, NewAssignment};
use quartermaster_audit::{AuditAction, AuditEvent, AuditSink};
use quartermaster_auth::{AccessPolicy, CallerContext, ReadScope, WriteAction};
use quartermaster_core::{AssignmentId, ConflictKind, DomainError, DomainResult, Entity};

use crate::directory::StoreUserDirectory;
use crate::ledger_store::{AssignmentFilter, LedgerStore};

use super::{audit_payload, emit_audit};

/// Assignment lifecycle: hand an asset to personnel, take it back.
pub struct AssignmentWorkflow<S, A> {
    store: S,
    policy: AccessPolicy<StoreUserDirectory<S>>,
    audit: A,
}

impl<S, A> AssignmentWorkflow<S, A>
where
    S: LedgerStore + Clone,
    A: AuditSink,
{
    pub fn new(store: S, audit: A) -> Self {
        let policy = AccessPolicy::new(StoreUserDirectory::new(store.clone()));
        Self {
            store,
            policy,
            audit,
        }
    }

    /// Assign an available asset. The caller is authorized against the
    /// asset's current base; the availability flip happens atomically in the
    /// store.
    #[instrument(skip_all, fields(actor = %caller.user_id, asset_id = %input.asset), err)]
    pub async fn create(
        &self,
        caller: &CallerContext,
        input: NewAssignment,
    ) -> DomainResult<Assignment> {
        let asset = self
            .store
            .asset(input.asset)
            .await?
            .ok_or(DomainError::NotFound(Entity::Asset))?;
        self.policy
            .authorize_write(caller, WriteAction::CreateAssignment, asset.current_base)
            .await?;

        let assignment = Assignment::create(input, asset.current_base, caller.user_id);
        let assignment = self.store.create_assignment(assignment).await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                caller.user_id,
                AuditAction::CreateAssignment,
                assignment.id,
                audit_payload(&assignment),
            )
            .with_origin(caller.origin),
        );
        Ok(assignment)
    }

    /// Close an active assignment, releasing the asset where it currently
    /// sits. The return date is today's date; a missing assignment answers
    /// the same as an already-returned one.
    #[instrument(skip_all, fields(actor = %caller.user_id, assignment_id = %id), err)]
    pub async fn return_asset(
        &self,
        caller: &CallerContext,
        id: AssignmentId,
    ) -> DomainResult<Assignment> {
        let existing = self
            .store
            .assignment(id)
            .await?
            .ok_or(DomainError::Conflict(
                ConflictKind::AssignmentAlreadyReturned,
            ))?;
        let asset = self
            .store
            .asset(existing.asset)
            .await?
            .ok_or_else(|| DomainError::persistence("asset row missing for assignment"))?;
        self.policy
            .authorize_write(caller, WriteAction::ReturnAssignment, asset.current_base)
            .await?;

        let assignment = self
            .store
            .return_assignment(id, Utc::now().date_naive())
            .await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                caller.user_id,
                AuditAction::ReturnAsset,
                assignment.id,
                audit_payload(&assignment),
            )
            .with_origin(caller.origin),
        );
        Ok(assignment)
    }

    /// List assignments; scoping follows the asset's current base.
    pub async fn list(
        &self,
        caller: &CallerContext,
        mut filter: AssignmentFilter,
    ) -> DomainResult<Vec<Assignment>> {
        let scope = ReadScope::resolve(caller, filter.base);
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        filter.base = scope.base_filter();
        Ok(self.store.assignments(filter).await?)
    }
}
