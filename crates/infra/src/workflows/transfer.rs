use chrono::Utc;
use tracing::instrument;

use quartermaster_audit::{AuditAction, AuditEvent, AuditSink};
use quartermaster_auth::{AccessPolicy, CallerContext, ReadScope, WriteAction};
use quartermaster_core::{ConflictKind, DomainError, DomainResult, Entity, TransferId};
use quartermaster_transfers::{NewTransfer, Transfer};

use crate::directory::StoreUserDirectory;
use crate::ledger_store::{LedgerStore, TransferFilter};

use super::{audit_payload, emit_audit};

/// Transfer lifecycle: request on the sending side, approve on the receiving
/// side, cancel from either.
pub struct TransferWorkflow<S, A> {
    store: S,
    policy: AccessPolicy<StoreUserDirectory<S>>,
    audit: A,
}

impl<S, A> TransferWorkflow<S, A>
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

    /// Open a pending transfer. The caller is authorized against the source
    /// base; the store re-checks the asset's state atomically.
    #[instrument(
        skip_all,
        fields(actor = %caller.user_id, from = %input.from_base, to = %input.to_base),
        err
    )]
    pub async fn request(
        &self,
        caller: &CallerContext,
        input: NewTransfer,
    ) -> DomainResult<Transfer> {
        input.validate()?;
        self.policy
            .authorize_write(caller, WriteAction::RequestTransfer, input.from_base)
            .await?;
        // Existence checks sit behind the policy gate, so a denied caller
        // learns nothing about which ids are real. Unknown endpoints are a
        // payload problem, not a missing record.
        if self.store.base(input.from_base).await?.is_none() {
            return Err(DomainError::validation("unknown source base"));
        }
        if self.store.base(input.to_base).await?.is_none() {
            return Err(DomainError::validation("unknown destination base"));
        }

        let transfer = Transfer::request(input, caller.user_id)?;
        let transfer = self.store.create_transfer(transfer).await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                caller.user_id,
                AuditAction::CreateTransfer,
                transfer.id,
                audit_payload(&transfer),
            )
            .with_origin(caller.origin),
        );
        Ok(transfer)
    }

    /// Approve a pending transfer, moving the asset to the destination base.
    /// Authorization runs against the destination; a missing transfer answers
    /// the same as an already-processed one.
    #[instrument(skip_all, fields(actor = %caller.user_id, transfer_id = %id), err)]
    pub async fn approve(&self, caller: &CallerContext, id: TransferId) -> DomainResult<Transfer> {
        let existing = self.store.transfer(id).await?.ok_or(DomainError::Conflict(
            ConflictKind::TransferAlreadyProcessed,
        ))?;
        self.policy
            .authorize_write(caller, WriteAction::ApproveTransfer, existing.to_base)
            .await?;

        let transfer = self
            .store
            .complete_transfer(id, caller.user_id, Utc::now())
            .await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                caller.user_id,
                AuditAction::ApproveTransfer,
                transfer.id,
                audit_payload(&transfer),
            )
            .with_origin(caller.origin),
        );
        Ok(transfer)
    }

    /// Cancel a pending transfer. Any authenticated caller may cancel; the
    /// pending-state guard is the only gate.
    #[instrument(skip_all, fields(actor = %caller.user_id, transfer_id = %id), err)]
    pub async fn cancel(&self, caller: &CallerContext, id: TransferId) -> DomainResult<Transfer> {
        let transfer = self.store.cancel_transfer(id).await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                caller.user_id,
                AuditAction::CancelTransfer,
                transfer.id,
                audit_payload(&transfer),
            )
            .with_origin(caller.origin),
        );
        Ok(transfer)
    }

    /// Fetch one transfer. A scoped caller only sees transfers touching
    /// their base; anything else reads as missing.
    pub async fn get(&self, caller: &CallerContext, id: TransferId) -> DomainResult<Transfer> {
        let scope = ReadScope::resolve(caller, None);
        if scope.is_empty() {
            return Err(DomainError::NotFound(Entity::Transfer));
        }
        let transfer = self
            .store
            .transfer(id)
            .await?
            .ok_or(DomainError::NotFound(Entity::Transfer))?;
        if let Some(base) = scope.base_filter() {
            if transfer.from_base != base && transfer.to_base != base {
                return Err(DomainError::NotFound(Entity::Transfer));
            }
        }
        Ok(transfer)
    }

    /// List transfers; a scoped caller sees traffic touching their base from
    /// either side.
    pub async fn list(
        &self,
        caller: &CallerContext,
        mut filter: TransferFilter,
    ) -> DomainResult<Vec<Transfer>> {
        let scope = ReadScope::resolve(caller, filter.base);
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        filter.base = scope.base_filter();
        Ok(self.store.transfers(filter).await?)
    }
}
