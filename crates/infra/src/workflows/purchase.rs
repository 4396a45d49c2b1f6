use tracing::instrument;

use quartermaster_audit::{AuditAction, AuditEvent, AuditSink};
use quartermaster_auth::{AccessPolicy, CallerContext, ReadScope, WriteAction};
use quartermaster_core::{DomainError, DomainResult, Entity, PurchaseId};
use quartermaster_purchasing::{NewPurchase, Purchase, PurchasePatch};

use crate::directory::StoreUserDirectory;
use crate::ledger_store::{LedgerStore, PurchaseFilter};

use super::{audit_payload, emit_audit};

/// Purchase lifecycle: create with asset materialization, amend, read.
pub struct PurchaseWorkflow<S, A> {
    store: S,
    policy: AccessPolicy<StoreUserDirectory<S>>,
    audit: A,
}

impl<S, A> PurchaseWorkflow<S, A>
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

    /// Record a purchase and materialize its assets at the receiving base.
    #[instrument(skip_all, fields(actor = %caller.user_id, base = %input.base), err)]
    pub async fn create(
        &self,
        caller: &CallerContext,
        input: NewPurchase,
    ) -> DomainResult<Purchase> {
        input.validate()?;
        self.policy
            .authorize_write(caller, WriteAction::CreatePurchase, input.base)
            .await?;
        // Existence checks sit behind the policy gate, so a denied caller
        // learns nothing about which ids are real. Unknown reference data is
        // a payload problem, not a missing record.
        if self.store.base(input.base).await?.is_none() {
            return Err(DomainError::validation("unknown base"));
        }
        if self
            .store
            .equipment_type(input.equipment_type)
            .await?
            .is_none()
        {
            return Err(DomainError::validation("unknown equipment type"));
        }

        let (purchase, assets) = Purchase::create(input, caller.user_id)?;
        let purchase = self.store.create_purchase(purchase, assets).await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                caller.user_id,
                AuditAction::CreatePurchase,
                purchase.id,
                audit_payload(&purchase),
            )
            .with_origin(caller.origin),
        );
        Ok(purchase)
    }

    /// Amend the mutable fields of an existing purchase.
    #[instrument(skip_all, fields(actor = %caller.user_id, purchase_id = %id), err)]
    pub async fn update(
        &self,
        caller: &CallerContext,
        id: PurchaseId,
        patch: PurchasePatch,
    ) -> DomainResult<Purchase> {
        let existing = self
            .store
            .purchase(id)
            .await?
            .ok_or(DomainError::NotFound(Entity::Purchase))?;
        self.policy
            .authorize_write(caller, WriteAction::UpdatePurchase, existing.base)
            .await?;
        patch.validate_for(existing.quantity)?;

        let purchase = self.store.update_purchase(id, patch).await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                caller.user_id,
                AuditAction::UpdatePurchase,
                purchase.id,
                audit_payload(&purchase),
            )
            .with_origin(caller.origin),
        );
        Ok(purchase)
    }

    /// Fetch one purchase inside the caller's read scope. A purchase that
    /// exists outside the scope is denied, not hidden; only a missing row
    /// reads as not found.
    pub async fn get(&self, caller: &CallerContext, id: PurchaseId) -> DomainResult<Purchase> {
        let scope = ReadScope::resolve(caller, None);
        if scope.is_empty() {
            return Err(DomainError::Unauthorized);
        }
        let purchase = self
            .store
            .purchase(id)
            .await?
            .ok_or(DomainError::NotFound(Entity::Purchase))?;
        if let Some(base) = scope.base_filter() {
            if purchase.base != base {
                return Err(DomainError::Unauthorized);
            }
        }
        Ok(purchase)
    }

    /// List purchases; the caller's scope overrides any requested base.
    pub async fn list(
        &self,
        caller: &CallerContext,
        mut filter: PurchaseFilter,
    ) -> DomainResult<Vec<Purchase>> {
        let scope = ReadScope::resolve(caller, filter.base);
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        filter.base = scope.base_filter();
        Ok(self.store.purchases(filter).await?)
    }
}
