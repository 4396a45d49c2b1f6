use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use quartermaster_assignments::{Assignment, AssignmentStatus};
use quartermaster_auth::User;
use quartermaster_core::{
    AssetId, AssignmentId, BaseId, ConflictKind, DomainError, Entity, EquipmentTypeId, PurchaseId,
    TransferId, UserId,
};
use quartermaster_ledger::{Asset, AssetStatus, Base, EquipmentType, Expenditure};
use quartermaster_purchasing::{Purchase, PurchasePatch};
use quartermaster_reporting::{MovementDetails, MovementTotals, MovementWindow};
use quartermaster_transfers::{Transfer, TransferStatus};

// ─────────────────────────────────────────────────────────────────────────────
// Query filters
// ─────────────────────────────────────────────────────────────────────────────

/// Filter for asset listings. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetFilter {
    pub base: Option<BaseId>,
    pub equipment_type: Option<EquipmentTypeId>,
    pub status: Option<AssetStatus>,
}

/// Filter for purchase listings.
///
/// `equipment_type` is a case-insensitive fragment matched against the
/// equipment type *name*, not an identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseFilter {
    pub base: Option<BaseId>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub equipment_type: Option<String>,
}

/// Filter for transfer listings. `base` matches either side of the movement,
/// so a base sees its inbound and outbound traffic alike.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferFilter {
    pub base: Option<BaseId>,
    pub status: Option<TransferStatus>,
}

/// Filter for assignment listings. `base` matches the asset's *current* base,
/// not the base recorded when the assignment was opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentFilter {
    pub base: Option<BaseId>,
    pub status: Option<AssignmentStatus>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors surfaced by a [`LedgerStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row the operation depends on does not exist.
    #[error("{0} not found")]
    NotFound(Entity),

    /// A guarded state change lost its race or targeted a record that is no
    /// longer in the required state. Callers cannot distinguish the two.
    #[error("{0}")]
    Conflict(ConflictKind),

    /// An insert collided with an existing primary key or unique constraint.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// The backend itself failed. The message is logged, never shown upstream.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => DomainError::NotFound(entity),
            StoreError::Conflict(kind) => DomainError::Conflict(kind),
            StoreError::Duplicate(msg) => DomainError::validation(format!("duplicate record: {msg}")),
            StoreError::Storage(msg) => DomainError::persistence(msg),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store trait
// ─────────────────────────────────────────────────────────────────────────────

/// Transactional current-state store for the asset ledger.
///
/// The store is the **single writer** for ledger state. Every mutation that
/// spans more than one row is exposed as one method and executes atomically:
/// either all of its rows change or none do. Workflow code composes these
/// methods but never sees a half-applied state.
///
/// ## Guarded state changes
///
/// The lifecycle mutations (`create_transfer`, `complete_transfer`,
/// `cancel_transfer`, `create_assignment`, `return_assignment`) are
/// compare-and-set operations: they re-check their preconditions *inside* the
/// transaction and fail with [`StoreError::Conflict`] when another writer got
/// there first. Callers may pre-read state for authorization, but correctness
/// never depends on that read.
///
/// ## Backends
///
/// - [`InMemoryLedgerStore`](crate::ledger_store::InMemoryLedgerStore) keeps
///   every table behind one lock (tests, development).
/// - [`PostgresLedgerStore`](crate::ledger_store::PostgresLedgerStore) maps
///   each method onto a transaction with row-level guards (production).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ── reference data ──────────────────────────────────────────────────────

    /// Inserts a base. Fails with [`StoreError::Duplicate`] if the id exists.
    async fn insert_base(&self, base: Base) -> Result<Base, StoreError>;

    async fn base(&self, id: BaseId) -> Result<Option<Base>, StoreError>;

    /// Inserts an equipment type. Fails with [`StoreError::Duplicate`] if the
    /// id exists.
    async fn insert_equipment_type(
        &self,
        equipment_type: EquipmentType,
    ) -> Result<EquipmentType, StoreError>;

    async fn equipment_type(&self, id: EquipmentTypeId)
        -> Result<Option<EquipmentType>, StoreError>;

    /// Inserts a user record for directory lookups.
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    // ── assets ──────────────────────────────────────────────────────────────

    async fn asset(&self, id: AssetId) -> Result<Option<Asset>, StoreError>;

    /// Lists assets newest first.
    async fn assets(&self, filter: AssetFilter) -> Result<Vec<Asset>, StoreError>;

    // ── purchases ───────────────────────────────────────────────────────────

    /// Stores a purchase together with the assets it materialized, atomically.
    /// A reader never observes the purchase without its assets.
    async fn create_purchase(
        &self,
        purchase: Purchase,
        assets: Vec<Asset>,
    ) -> Result<Purchase, StoreError>;

    async fn purchase(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError>;

    /// Applies an amendment to a stored purchase and returns the updated row.
    ///
    /// Already-issued assets are untouched; only cost, vendor and notes move.
    async fn update_purchase(
        &self,
        id: PurchaseId,
        patch: PurchasePatch,
    ) -> Result<Purchase, StoreError>;

    /// Lists purchases, most recent purchase date first.
    async fn purchases(&self, filter: PurchaseFilter) -> Result<Vec<Purchase>, StoreError>;

    // ── transfers ───────────────────────────────────────────────────────────

    /// Stores a pending transfer after re-checking, inside the transaction,
    /// that the asset exists, sits at the transfer's source base, is
    /// `available`, and has no other pending transfer.
    ///
    /// ## Errors
    ///
    /// - [`StoreError::NotFound`] when the asset or a base is missing.
    /// - [`StoreError::Conflict`] with [`ConflictKind::AssetNotTransferable`]
    ///   when any guard fails.
    async fn create_transfer(&self, transfer: Transfer) -> Result<Transfer, StoreError>;

    async fn transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError>;

    /// Completes a pending transfer and relocates its asset to the
    /// destination base in the same transaction.
    ///
    /// Fails with [`ConflictKind::TransferAlreadyProcessed`] when the transfer
    /// is missing or no longer pending; the two cases are indistinguishable.
    async fn complete_transfer(
        &self,
        id: TransferId,
        approved_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Transfer, StoreError>;

    /// Cancels a pending transfer. Same conflict contract as
    /// [`LedgerStore::complete_transfer`]; the asset does not move.
    async fn cancel_transfer(&self, id: TransferId) -> Result<Transfer, StoreError>;

    /// Lists transfers newest first.
    async fn transfers(&self, filter: TransferFilter) -> Result<Vec<Transfer>, StoreError>;

    // ── assignments ─────────────────────────────────────────────────────────

    /// Stores an assignment and flips its asset from `available` to
    /// `assigned` in the same transaction.
    ///
    /// ## Errors
    ///
    /// - [`StoreError::NotFound`] when the asset is missing.
    /// - [`StoreError::Conflict`] with [`ConflictKind::AssetNotAvailable`]
    ///   when the asset is not available or a pending transfer holds it.
    async fn create_assignment(&self, assignment: Assignment) -> Result<Assignment, StoreError>;

    async fn assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StoreError>;

    /// Closes an active assignment and releases its asset back to
    /// `available` in the same transaction.
    ///
    /// Fails with [`ConflictKind::AssignmentAlreadyReturned`] when the
    /// assignment is missing or not active.
    async fn return_assignment(
        &self,
        id: AssignmentId,
        returned_on: NaiveDate,
    ) -> Result<Assignment, StoreError>;

    /// Lists assignments newest first.
    async fn assignments(&self, filter: AssignmentFilter) -> Result<Vec<Assignment>, StoreError>;

    // ── expenditures ────────────────────────────────────────────────────────

    /// Records an expenditure and marks its asset `expended` in the same
    /// transaction. Write access is reserved for external consumption feeds;
    /// the HTTP surface only reads the aggregates.
    async fn insert_expenditure(&self, expenditure: Expenditure) -> Result<Expenditure, StoreError>;

    // ── reporting ───────────────────────────────────────────────────────────

    /// Counts assets created strictly before midnight (UTC) of `cutoff`,
    /// regardless of status. `None` counts every asset ever created.
    async fn count_assets_created_before(
        &self,
        base: Option<BaseId>,
        cutoff: Option<NaiveDate>,
    ) -> Result<u64, StoreError>;

    /// Counts assets whose status is anything but `expended`.
    async fn count_assets_not_expended(&self, base: Option<BaseId>) -> Result<u64, StoreError>;

    /// Counts distinct assets held by an active assignment.
    async fn count_assets_on_assignment(&self, base: Option<BaseId>) -> Result<u64, StoreError>;

    /// Sums quantity movement inside the window: purchases by purchase date,
    /// completed transfers by transfer date, expenditures by expended date.
    async fn movement_totals(&self, window: MovementWindow)
        -> Result<MovementTotals, StoreError>;

    /// Returns the rows behind [`LedgerStore::movement_totals`], newest first,
    /// capped per section.
    async fn movement_details(
        &self,
        window: MovementWindow,
    ) -> Result<MovementDetails, StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn insert_base(&self, base: Base) -> Result<Base, StoreError> {
        (**self).insert_base(base).await
    }

    async fn base(&self, id: BaseId) -> Result<Option<Base>, StoreError> {
        (**self).base(id).await
    }

    async fn insert_equipment_type(
        &self,
        equipment_type: EquipmentType,
    ) -> Result<EquipmentType, StoreError> {
        (**self).insert_equipment_type(equipment_type).await
    }

    async fn equipment_type(
        &self,
        id: EquipmentTypeId,
    ) -> Result<Option<EquipmentType>, StoreError> {
        (**self).equipment_type(id).await
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        (**self).insert_user(user).await
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).user(id).await
    }

    async fn asset(&self, id: AssetId) -> Result<Option<Asset>, StoreError> {
        (**self).asset(id).await
    }

    async fn assets(&self, filter: AssetFilter) -> Result<Vec<Asset>, StoreError> {
        (**self).assets(filter).await
    }

    async fn create_purchase(
        &self,
        purchase: Purchase,
        assets: Vec<Asset>,
    ) -> Result<Purchase, StoreError> {
        (**self).create_purchase(purchase, assets).await
    }

    async fn purchase(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
        (**self).purchase(id).await
    }

    async fn update_purchase(
        &self,
        id: PurchaseId,
        patch: PurchasePatch,
    ) -> Result<Purchase, StoreError> {
        (**self).update_purchase(id, patch).await
    }

    async fn purchases(&self, filter: PurchaseFilter) -> Result<Vec<Purchase>, StoreError> {
        (**self).purchases(filter).await
    }

    async fn create_transfer(&self, transfer: Transfer) -> Result<Transfer, StoreError> {
        (**self).create_transfer(transfer).await
    }

    async fn transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError> {
        (**self).transfer(id).await
    }

    async fn complete_transfer(
        &self,
        id: TransferId,
        approved_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Transfer, StoreError> {
        (**self).complete_transfer(id, approved_by, at).await
    }

    async fn cancel_transfer(&self, id: TransferId) -> Result<Transfer, StoreError> {
        (**self).cancel_transfer(id).await
    }

    async fn transfers(&self, filter: TransferFilter) -> Result<Vec<Transfer>, StoreError> {
        (**self).transfers(filter).await
    }

    async fn create_assignment(&self, assignment: Assignment) -> Result<Assignment, StoreError> {
        (**self).create_assignment(assignment).await
    }

    async fn assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StoreError> {
        (**self).assignment(id).await
    }

    async fn return_assignment(
        &self,
        id: AssignmentId,
        returned_on: NaiveDate,
    ) -> Result<Assignment, StoreError> {
        (**self).return_assignment(id, returned_on).await
    }

    async fn assignments(&self, filter: AssignmentFilter) -> Result<Vec<Assignment>, StoreError> {
        (**self).assignments(filter).await
    }

    async fn insert_expenditure(
        &self,
        expenditure: Expenditure,
    ) -> Result<Expenditure, StoreError> {
        (**self).insert_expenditure(expenditure).await
    }

    async fn count_assets_created_before(
        &self,
        base: Option<BaseId>,
        cutoff: Option<NaiveDate>,
    ) -> Result<u64, StoreError> {
        (**self).count_assets_created_before(base, cutoff).await
    }

    async fn count_assets_not_expended(&self, base: Option<BaseId>) -> Result<u64, StoreError> {
        (**self).count_assets_not_expended(base).await
    }

    async fn count_assets_on_assignment(&self, base: Option<BaseId>) -> Result<u64, StoreError> {
        (**self).count_assets_on_assignment(base).await
    }

    async fn movement_totals(
        &self,
        window: MovementWindow,
    ) -> Result<MovementTotals, StoreError> {
        (**self).movement_totals(window).await
    }

    async fn movement_details(
        &self,
        window: MovementWindow,
    ) -> Result<MovementDetails, StoreError> {
        (**self).movement_details(window).await
    }
}
