use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use quartermaster_assignments::{Assignment, AssignmentStatus};
use quartermaster_auth::User;
use quartermaster_core::{
    AssetId, AssignmentId, BaseId, ConflictKind, Entity, EquipmentTypeId, PurchaseId, TransferId,
    UserId,
};
use quartermaster_ledger::{Asset, AssetStatus, Base, EquipmentType, Expenditure};
use quartermaster_purchasing::{Purchase, PurchasePatch};
use quartermaster_reporting::{
    MovementDetails, MovementTotals, MovementWindow, PurchaseMovement, TransferMovement,
    MOVEMENT_DETAIL_LIMIT,
};
use quartermaster_transfers::{Transfer, TransferStatus};

use super::r#trait::{
    AssetFilter, AssignmentFilter, LedgerStore, PurchaseFilter, StoreError, TransferFilter,
};
use super::midnight_utc;

#[derive(Debug, Default)]
struct Tables {
    bases: HashMap<BaseId, Base>,
    equipment_types: HashMap<EquipmentTypeId, EquipmentType>,
    users: HashMap<UserId, User>,
    assets: HashMap<AssetId, Asset>,
    purchases: HashMap<PurchaseId, Purchase>,
    transfers: HashMap<TransferId, Transfer>,
    assignments: HashMap<AssignmentId, Assignment>,
    expenditures: Vec<Expenditure>,
}

impl Tables {
    fn pending_transfer_holds(&self, asset: AssetId) -> bool {
        self.transfers
            .values()
            .any(|t| t.asset == asset && t.status == TransferStatus::Pending)
    }

    fn equipment_name(&self, id: EquipmentTypeId) -> (String, String) {
        self.equipment_types
            .get(&id)
            .map(|t| (t.name.clone(), t.category.clone()))
            .unwrap_or_default()
    }

    fn base_name(&self, id: BaseId) -> String {
        self.bases.get(&id).map(|b| b.name.clone()).unwrap_or_default()
    }
}

/// In-memory ledger store.
///
/// Every table lives behind one `RwLock`, so each mutating method holds the
/// write guard for its whole validate-then-apply sequence. That gives the
/// same atomicity the Postgres backend gets from transactions. Intended for
/// tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_base(&self, base: Base) -> Result<Base, StoreError> {
        let mut tables = self.write()?;
        if tables.bases.contains_key(&base.id) {
            return Err(StoreError::Duplicate(format!("base {}", base.id)));
        }
        tables.bases.insert(base.id, base.clone());
        Ok(base)
    }

    async fn base(&self, id: BaseId) -> Result<Option<Base>, StoreError> {
        Ok(self.read()?.bases.get(&id).cloned())
    }

    async fn insert_equipment_type(
        &self,
        equipment_type: EquipmentType,
    ) -> Result<EquipmentType, StoreError> {
        let mut tables = self.write()?;
        if tables.equipment_types.contains_key(&equipment_type.id) {
            return Err(StoreError::Duplicate(format!(
                "equipment type {}",
                equipment_type.id
            )));
        }
        tables
            .equipment_types
            .insert(equipment_type.id, equipment_type.clone());
        Ok(equipment_type)
    }

    async fn equipment_type(
        &self,
        id: EquipmentTypeId,
    ) -> Result<Option<EquipmentType>, StoreError> {
        Ok(self.read()?.equipment_types.get(&id).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn asset(&self, id: AssetId) -> Result<Option<Asset>, StoreError> {
        Ok(self.read()?.assets.get(&id).cloned())
    }

    async fn assets(&self, filter: AssetFilter) -> Result<Vec<Asset>, StoreError> {
        let tables = self.read()?;
        let mut rows: Vec<Asset> = tables
            .assets
            .values()
            .filter(|a| filter.base.is_none_or(|b| a.current_base == b))
            .filter(|a| filter.equipment_type.is_none_or(|t| a.equipment_type == t))
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(rows)
    }

    async fn create_purchase(
        &self,
        purchase: Purchase,
        assets: Vec<Asset>,
    ) -> Result<Purchase, StoreError> {
        let mut tables = self.write()?;
        if !tables.bases.contains_key(&purchase.base) {
            return Err(StoreError::NotFound(Entity::Base));
        }
        if !tables.equipment_types.contains_key(&purchase.equipment_type) {
            return Err(StoreError::NotFound(Entity::EquipmentType));
        }
        if tables.purchases.contains_key(&purchase.id) {
            return Err(StoreError::Duplicate(format!("purchase {}", purchase.id)));
        }
        for asset in assets {
            tables.assets.insert(asset.id, asset);
        }
        tables.purchases.insert(purchase.id, purchase.clone());
        Ok(purchase)
    }

    async fn purchase(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
        Ok(self.read()?.purchases.get(&id).cloned())
    }

    async fn update_purchase(
        &self,
        id: PurchaseId,
        patch: PurchasePatch,
    ) -> Result<Purchase, StoreError> {
        let mut tables = self.write()?;
        let purchase = tables
            .purchases
            .get_mut(&id)
            .ok_or(StoreError::NotFound(Entity::Purchase))?;
        // Workflows validate the patch first; a failure here means a caller
        // bypassed them.
        purchase
            .apply_patch(patch)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(purchase.clone())
    }

    async fn purchases(&self, filter: PurchaseFilter) -> Result<Vec<Purchase>, StoreError> {
        let tables = self.read()?;
        let fragment = filter.equipment_type.map(|f| f.to_lowercase());
        let mut rows: Vec<Purchase> = tables
            .purchases
            .values()
            .filter(|p| filter.base.is_none_or(|b| p.base == b))
            .filter(|p| filter.start.is_none_or(|d| p.purchase_date >= d))
            .filter(|p| filter.end.is_none_or(|d| p.purchase_date <= d))
            .filter(|p| {
                fragment.as_ref().is_none_or(|f| {
                    tables
                        .equipment_types
                        .get(&p.equipment_type)
                        .is_some_and(|t| t.name.to_lowercase().contains(f))
                })
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.purchase_date
                .cmp(&a.purchase_date)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(rows)
    }

    async fn create_transfer(&self, transfer: Transfer) -> Result<Transfer, StoreError> {
        let mut tables = self.write()?;
        if !tables.bases.contains_key(&transfer.from_base)
            || !tables.bases.contains_key(&transfer.to_base)
        {
            return Err(StoreError::NotFound(Entity::Base));
        }
        let asset = tables
            .assets
            .get(&transfer.asset)
            .ok_or(StoreError::NotFound(Entity::Asset))?;
        if asset.current_base != transfer.from_base
            || !asset.is_available()
            || tables.pending_transfer_holds(transfer.asset)
        {
            return Err(StoreError::Conflict(ConflictKind::AssetNotTransferable));
        }
        tables.transfers.insert(transfer.id, transfer.clone());
        Ok(transfer)
    }

    async fn transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError> {
        Ok(self.read()?.transfers.get(&id).cloned())
    }

    async fn complete_transfer(
        &self,
        id: TransferId,
        approved_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Transfer, StoreError> {
        let mut tables = self.write()?;
        let mut transfer = tables
            .transfers
            .get(&id)
            .cloned()
            .ok_or(StoreError::Conflict(ConflictKind::TransferAlreadyProcessed))?;
        transfer
            .complete(approved_by, at)
            .map_err(|_| StoreError::Conflict(ConflictKind::TransferAlreadyProcessed))?;
        let to_base = transfer.to_base;
        let asset = tables
            .assets
            .get_mut(&transfer.asset)
            .ok_or_else(|| StoreError::Storage("asset row missing for transfer".to_string()))?;
        asset.relocate(to_base);
        tables.transfers.insert(id, transfer.clone());
        Ok(transfer)
    }

    async fn cancel_transfer(&self, id: TransferId) -> Result<Transfer, StoreError> {
        let mut tables = self.write()?;
        let transfer = tables
            .transfers
            .get_mut(&id)
            .ok_or(StoreError::Conflict(ConflictKind::TransferAlreadyProcessed))?;
        transfer
            .cancel()
            .map_err(|_| StoreError::Conflict(ConflictKind::TransferAlreadyProcessed))?;
        Ok(transfer.clone())
    }

    async fn transfers(&self, filter: TransferFilter) -> Result<Vec<Transfer>, StoreError> {
        let tables = self.read()?;
        let mut rows: Vec<Transfer> = tables
            .transfers
            .values()
            .filter(|t| filter.base.is_none_or(|b| t.from_base == b || t.to_base == b))
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(rows)
    }

    async fn create_assignment(&self, assignment: Assignment) -> Result<Assignment, StoreError> {
        let mut tables = self.write()?;
        if tables.pending_transfer_holds(assignment.asset) {
            return Err(StoreError::Conflict(ConflictKind::AssetNotAvailable));
        }
        let asset = tables
            .assets
            .get_mut(&assignment.asset)
            .ok_or(StoreError::NotFound(Entity::Asset))?;
        asset
            .assign()
            .map_err(|_| StoreError::Conflict(ConflictKind::AssetNotAvailable))?;
        tables.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StoreError> {
        Ok(self.read()?.assignments.get(&id).cloned())
    }

    async fn return_assignment(
        &self,
        id: AssignmentId,
        returned_on: NaiveDate,
    ) -> Result<Assignment, StoreError> {
        let mut tables = self.write()?;
        let mut assignment = tables.assignments.get(&id).cloned().ok_or(StoreError::Conflict(
            ConflictKind::AssignmentAlreadyReturned,
        ))?;
        assignment
            .mark_returned(returned_on)
            .map_err(|_| StoreError::Conflict(ConflictKind::AssignmentAlreadyReturned))?;
        let asset = tables
            .assets
            .get_mut(&assignment.asset)
            .ok_or_else(|| StoreError::Storage("asset row missing for assignment".to_string()))?;
        asset.release();
        tables.assignments.insert(id, assignment.clone());
        Ok(assignment)
    }

    async fn assignments(&self, filter: AssignmentFilter) -> Result<Vec<Assignment>, StoreError> {
        let tables = self.read()?;
        let mut rows: Vec<Assignment> = tables
            .assignments
            .values()
            .filter(|a| {
                filter.base.is_none_or(|b| {
                    tables
                        .assets
                        .get(&a.asset)
                        .is_some_and(|asset| asset.current_base == b)
                })
            })
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(rows)
    }

    async fn insert_expenditure(
        &self,
        expenditure: Expenditure,
    ) -> Result<Expenditure, StoreError> {
        let mut tables = self.write()?;
        if !tables.bases.contains_key(&expenditure.base) {
            return Err(StoreError::NotFound(Entity::Base));
        }
        let asset = tables
            .assets
            .get_mut(&expenditure.asset)
            .ok_or(StoreError::NotFound(Entity::Asset))?;
        asset.expend();
        tables.expenditures.push(expenditure.clone());
        Ok(expenditure)
    }

    async fn count_assets_created_before(
        &self,
        base: Option<BaseId>,
        cutoff: Option<NaiveDate>,
    ) -> Result<u64, StoreError> {
        let tables = self.read()?;
        let cutoff = cutoff.map(midnight_utc);
        let count = tables
            .assets
            .values()
            .filter(|a| base.is_none_or(|b| a.current_base == b))
            .filter(|a| cutoff.is_none_or(|c| a.created_at < c))
            .count();
        Ok(count as u64)
    }

    async fn count_assets_not_expended(&self, base: Option<BaseId>) -> Result<u64, StoreError> {
        let tables = self.read()?;
        let count = tables
            .assets
            .values()
            .filter(|a| base.is_none_or(|b| a.current_base == b))
            .filter(|a| a.status != AssetStatus::Expended)
            .count();
        Ok(count as u64)
    }

    async fn count_assets_on_assignment(&self, base: Option<BaseId>) -> Result<u64, StoreError> {
        let tables = self.read()?;
        let mut seen: Vec<AssetId> = tables
            .assignments
            .values()
            .filter(|a| a.status == AssignmentStatus::Active)
            .filter(|a| {
                base.is_none_or(|b| {
                    tables
                        .assets
                        .get(&a.asset)
                        .is_some_and(|asset| asset.current_base == b)
                })
            })
            .map(|a| a.asset)
            .collect();
        seen.sort_by_key(|id| *id.as_uuid());
        seen.dedup();
        Ok(seen.len() as u64)
    }

    async fn movement_totals(
        &self,
        window: MovementWindow,
    ) -> Result<MovementTotals, StoreError> {
        let tables = self.read()?;
        let mut totals = MovementTotals::default();

        for p in tables.purchases.values() {
            if window.covers_base(p.base) && window.contains_date(p.purchase_date) {
                totals.purchases += u64::from(p.quantity);
            }
        }
        for t in tables.transfers.values() {
            if t.status != TransferStatus::Completed || !window.contains_date(t.transfer_date) {
                continue;
            }
            if window.covers_base(t.to_base) {
                totals.transfers_in += u64::from(t.quantity);
            }
            if window.covers_base(t.from_base) {
                totals.transfers_out += u64::from(t.quantity);
            }
        }
        for e in &tables.expenditures {
            if window.covers_base(e.base) && window.contains_date(e.expended_date) {
                totals.expended += u64::from(e.quantity);
            }
        }
        Ok(totals)
    }

    async fn movement_details(
        &self,
        window: MovementWindow,
    ) -> Result<MovementDetails, StoreError> {
        let tables = self.read()?;

        let mut purchases: Vec<PurchaseMovement> = tables
            .purchases
            .values()
            .filter(|p| window.covers_base(p.base) && window.contains_date(p.purchase_date))
            .map(|p| {
                let (equipment_type, category) = tables.equipment_name(p.equipment_type);
                PurchaseMovement {
                    purchase: p.id,
                    quantity: p.quantity,
                    purchase_date: p.purchase_date,
                    vendor: p.vendor.clone(),
                    equipment_type,
                    category,
                }
            })
            .collect();
        purchases.sort_by(|a, b| {
            b.purchase_date
                .cmp(&a.purchase_date)
                .then_with(|| b.purchase.as_uuid().cmp(a.purchase.as_uuid()))
        });
        purchases.truncate(MOVEMENT_DETAIL_LIMIT);

        let completed_in_window = |t: &&Transfer| {
            t.status == TransferStatus::Completed && window.contains_date(t.transfer_date)
        };
        let to_movement = |t: &Transfer, counterparty: BaseId| {
            let equipment_type = tables
                .assets
                .get(&t.asset)
                .map(|a| tables.equipment_name(a.equipment_type).0)
                .unwrap_or_default();
            TransferMovement {
                transfer: t.id,
                quantity: t.quantity,
                transfer_date: t.transfer_date,
                counterparty_base: tables.base_name(counterparty),
                equipment_type,
                notes: t.notes.clone(),
            }
        };

        let mut transfers_in: Vec<TransferMovement> = tables
            .transfers
            .values()
            .filter(completed_in_window)
            .filter(|t| window.covers_base(t.to_base))
            .map(|t| to_movement(t, t.from_base))
            .collect();
        let mut transfers_out: Vec<TransferMovement> = tables
            .transfers
            .values()
            .filter(completed_in_window)
            .filter(|t| window.covers_base(t.from_base))
            .map(|t| to_movement(t, t.to_base))
            .collect();
        for section in [&mut transfers_in, &mut transfers_out] {
            section.sort_by(|a, b| {
                b.transfer_date
                    .cmp(&a.transfer_date)
                    .then_with(|| b.transfer.as_uuid().cmp(a.transfer.as_uuid()))
            });
            section.truncate(MOVEMENT_DETAIL_LIMIT);
        }

        Ok(MovementDetails {
            purchases,
            transfers_in,
            transfers_out,
        })
    }
}
