//! Postgres-backed ledger store implementation.
//!
//! This module provides persistent ledger storage using PostgreSQL. Guarded
//! state changes run inside transactions with `FOR UPDATE` row locks or
//! predicated `UPDATE ... WHERE status = ...` statements, so concurrent
//! writers serialize on the database rather than on application state.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Duplicate` | Insert collided with an existing id or unique constraint |
//! | Database (foreign key violation) | `23503` | `Storage` | Referential integrity violation (callers validate references first) |
//! | Database (check constraint violation) | `23514` | `Storage` | Invalid data (e.g. quantity <= 0) |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolClosed | N/A | `Storage` | Connection pool was closed |
//! | Other | N/A | `Storage` | Network errors, connection failures, etc. |
//!
//! Conflict mapping (`StoreError::Conflict`) never comes from SQLx directly:
//! it is produced by the guard logic when a predicated update matches no row
//! or a locked asset fails its precondition.
//!
//! ## Thread Safety
//!
//! `PostgresLedgerStore` is `Send + Sync` and can be shared across threads.
//! All operations use the SQLx connection pool which handles thread-safe
//! connection management.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use quartermaster_assignments::{Assignment, AssignmentStatus};
use quartermaster_auth::{Role, User};
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

/// Postgres-backed ledger store.
///
/// Each trait method maps onto at most one transaction. The compare-and-set
/// methods re-check their preconditions inside that transaction, either via
/// `SELECT ... FOR UPDATE` on the asset row or via a predicated `UPDATE`
/// whose empty result signals the conflict.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    /// Create a new PostgresLedgerStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` and return a store over a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the ledger tables and indexes if they do not exist yet.
    ///
    /// Idempotent; safe to run on every startup.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    /// Lock an asset row for the remainder of the transaction.
    ///
    /// Both transfer creation and assignment creation lock the asset first,
    /// so their guards cannot interleave.
    async fn lock_asset(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: AssetId,
    ) -> Result<Option<Asset>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, equipment_type_id, current_base_id, status, serial_number, purchase_id, created_at
            FROM assets
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_asset", e))?;

        match row {
            Some(row) => {
                let parsed = AssetRow::from_row(&row)
                    .map_err(|e| StoreError::Storage(format!("failed to decode asset row: {e}")))?;
                Ok(Some(parsed.into_asset()?))
            }
            None => Ok(None),
        }
    }

    async fn base_exists(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: BaseId,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM bases WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("base_exists", e))?;
        row.try_get::<bool, _>(0)
            .map_err(|e| StoreError::Storage(format!("failed to decode existence check: {e}")))
    }

    async fn pending_transfer_holds(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        asset: AssetId,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM transfers WHERE asset_id = $1 AND status = 'pending')",
        )
        .bind(asset.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("pending_transfer_check", e))?;
        row.try_get::<bool, _>(0)
            .map_err(|e| StoreError::Storage(format!("failed to decode existence check: {e}")))
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn insert_base(&self, base: Base) -> Result<Base, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bases (id, name, location, commander_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(base.id.as_uuid())
        .bind(&base.name)
        .bind(&base.location)
        .bind(base.commander.map(|u| *u.as_uuid()))
        .bind(base.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("base {}", base.id))
            } else {
                map_sqlx_error("insert_base", e)
            }
        })?;
        Ok(base)
    }

    async fn base(&self, id: BaseId) -> Result<Option<Base>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, location, commander_id, created_at FROM bases WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_base", e))?;

        match row {
            Some(row) => {
                let parsed = BaseRow::from_row(&row)
                    .map_err(|e| StoreError::Storage(format!("failed to decode base row: {e}")))?;
                Ok(Some(parsed.into()))
            }
            None => Ok(None),
        }
    }

    async fn insert_equipment_type(
        &self,
        equipment_type: EquipmentType,
    ) -> Result<EquipmentType, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO equipment_types (id, name, category, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(equipment_type.id.as_uuid())
        .bind(&equipment_type.name)
        .bind(&equipment_type.category)
        .bind(equipment_type.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("equipment type {}", equipment_type.id))
            } else {
                map_sqlx_error("insert_equipment_type", e)
            }
        })?;
        Ok(equipment_type)
    }

    async fn equipment_type(
        &self,
        id: EquipmentTypeId,
    ) -> Result<Option<EquipmentType>, StoreError> {
        let row =
            sqlx::query("SELECT id, name, category, created_at FROM equipment_types WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("get_equipment_type", e))?;

        match row {
            Some(row) => {
                let parsed = EquipmentTypeRow::from_row(&row).map_err(|e| {
                    StoreError::Storage(format!("failed to decode equipment type row: {e}"))
                })?;
                Ok(Some(parsed.into()))
            }
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, role, base_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(user.role.as_str())
        .bind(user.home_base.map(|b| *b.as_uuid()))
        .bind(user.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("user {}", user.username))
            } else {
                map_sqlx_error("insert_user", e)
            }
        })?;
        Ok(user)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row =
            sqlx::query("SELECT id, username, role, base_id, created_at FROM users WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("get_user", e))?;

        match row {
            Some(row) => {
                let parsed = UserRow::from_row(&row)
                    .map_err(|e| StoreError::Storage(format!("failed to decode user row: {e}")))?;
                Ok(Some(parsed.into_user()?))
            }
            None => Ok(None),
        }
    }

    async fn asset(&self, id: AssetId) -> Result<Option<Asset>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, equipment_type_id, current_base_id, status, serial_number, purchase_id, created_at
            FROM assets
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_asset", e))?;

        match row {
            Some(row) => {
                let parsed = AssetRow::from_row(&row)
                    .map_err(|e| StoreError::Storage(format!("failed to decode asset row: {e}")))?;
                Ok(Some(parsed.into_asset()?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, filter), err)]
    async fn assets(&self, filter: AssetFilter) -> Result<Vec<Asset>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, equipment_type_id, current_base_id, status, serial_number, purchase_id, created_at
            FROM assets
            WHERE ($1::uuid IS NULL OR current_base_id = $1)
              AND ($2::uuid IS NULL OR equipment_type_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(filter.base.map(|b| *b.as_uuid()))
        .bind(filter.equipment_type.map(|t| *t.as_uuid()))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_assets", e))?;

        let mut assets = Vec::with_capacity(rows.len());
        for row in rows {
            let parsed = AssetRow::from_row(&row)
                .map_err(|e| StoreError::Storage(format!("failed to decode asset row: {e}")))?;
            assets.push(parsed.into_asset()?);
        }
        Ok(assets)
    }

    #[instrument(
        skip(self, purchase, assets),
        fields(purchase_id = %purchase.id, asset_count = assets.len()),
        err
    )]
    async fn create_purchase(
        &self,
        purchase: Purchase,
        assets: Vec<Asset>,
    ) -> Result<Purchase, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        if !Self::base_exists(&mut tx, purchase.base).await? {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound(Entity::Base));
        }

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, base_id, equipment_type_id, quantity, unit_cost, total_cost,
                purchase_date, vendor, notes, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(purchase.id.as_uuid())
        .bind(purchase.base.as_uuid())
        .bind(purchase.equipment_type.as_uuid())
        .bind(purchase.quantity as i32)
        .bind(purchase.unit_cost.map(|v| v as i64))
        .bind(purchase.total_cost.map(|v| v as i64))
        .bind(purchase.purchase_date)
        .bind(&purchase.vendor)
        .bind(&purchase.notes)
        .bind(purchase.created_by.as_uuid())
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("purchase {}", purchase.id))
            } else {
                map_sqlx_error("insert_purchase", e)
            }
        })?;

        for asset in &assets {
            sqlx::query(
                r#"
                INSERT INTO assets (
                    id, equipment_type_id, current_base_id, status, serial_number, purchase_id, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(asset.id.as_uuid())
            .bind(asset.equipment_type.as_uuid())
            .bind(asset.current_base.as_uuid())
            .bind(asset.status.as_str())
            .bind(&asset.serial_number)
            .bind(asset.purchase.map(|p| *p.as_uuid()))
            .bind(asset.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_asset", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(purchase)
    }

    async fn purchase(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, base_id, equipment_type_id, quantity, unit_cost, total_cost,
                   purchase_date, vendor, notes, created_by, created_at, updated_at
            FROM purchases
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_purchase", e))?;

        match row {
            Some(row) => {
                let parsed = PurchaseRow::from_row(&row).map_err(|e| {
                    StoreError::Storage(format!("failed to decode purchase row: {e}"))
                })?;
                Ok(Some(parsed.into_purchase()))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, patch), fields(purchase_id = %id), err)]
    async fn update_purchase(
        &self,
        id: PurchaseId,
        patch: PurchasePatch,
    ) -> Result<Purchase, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE purchases
            SET unit_cost = COALESCE($2, unit_cost),
                total_cost = CASE WHEN $2::bigint IS NULL THEN total_cost ELSE $2 * quantity END,
                vendor = COALESCE($3, vendor),
                notes = COALESCE($4, notes),
                updated_at = $5
            WHERE id = $1
            RETURNING id, base_id, equipment_type_id, quantity, unit_cost, total_cost,
                      purchase_date, vendor, notes, created_by, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(patch.unit_cost.map(|v| v as i64))
        .bind(patch.vendor)
        .bind(patch.notes)
        .bind(Utc::now())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_purchase", e))?;

        let row = row.ok_or(StoreError::NotFound(Entity::Purchase))?;
        let parsed = PurchaseRow::from_row(&row)
            .map_err(|e| StoreError::Storage(format!("failed to decode purchase row: {e}")))?;
        Ok(parsed.into_purchase())
    }

    #[instrument(skip(self, filter), err)]
    async fn purchases(&self, filter: PurchaseFilter) -> Result<Vec<Purchase>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.base_id, p.equipment_type_id, p.quantity, p.unit_cost, p.total_cost,
                   p.purchase_date, p.vendor, p.notes, p.created_by, p.created_at, p.updated_at
            FROM purchases p
            JOIN equipment_types et ON et.id = p.equipment_type_id
            WHERE ($1::uuid IS NULL OR p.base_id = $1)
              AND ($2::date IS NULL OR p.purchase_date >= $2)
              AND ($3::date IS NULL OR p.purchase_date <= $3)
              AND ($4::text IS NULL OR et.name ILIKE '%' || $4 || '%')
            ORDER BY p.purchase_date DESC, p.id DESC
            "#,
        )
        .bind(filter.base.map(|b| *b.as_uuid()))
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.equipment_type)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_purchases", e))?;

        let mut purchases = Vec::with_capacity(rows.len());
        for row in rows {
            let parsed = PurchaseRow::from_row(&row)
                .map_err(|e| StoreError::Storage(format!("failed to decode purchase row: {e}")))?;
            purchases.push(parsed.into_purchase());
        }
        Ok(purchases)
    }

    #[instrument(
        skip(self, transfer),
        fields(transfer_id = %transfer.id, asset_id = %transfer.asset),
        err
    )]
    async fn create_transfer(&self, transfer: Transfer) -> Result<Transfer, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        if !Self::base_exists(&mut tx, transfer.from_base).await?
            || !Self::base_exists(&mut tx, transfer.to_base).await?
        {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound(Entity::Base));
        }

        let asset = match Self::lock_asset(&mut tx, transfer.asset).await? {
            Some(asset) => asset,
            None => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::NotFound(Entity::Asset));
            }
        };

        if asset.current_base != transfer.from_base
            || !asset.is_available()
            || Self::pending_transfer_holds(&mut tx, transfer.asset).await?
        {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::Conflict(ConflictKind::AssetNotTransferable));
        }

        sqlx::query(
            r#"
            INSERT INTO transfers (
                id, asset_id, from_base_id, to_base_id, quantity, status,
                transfer_date, requested_by, approved_by, notes, created_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(transfer.id.as_uuid())
        .bind(transfer.asset.as_uuid())
        .bind(transfer.from_base.as_uuid())
        .bind(transfer.to_base.as_uuid())
        .bind(transfer.quantity as i32)
        .bind(transfer.status.as_str())
        .bind(transfer.transfer_date)
        .bind(transfer.requested_by.as_uuid())
        .bind(transfer.approved_by.map(|u| *u.as_uuid()))
        .bind(&transfer.notes)
        .bind(transfer.created_at)
        .bind(transfer.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // The partial unique index on pending transfers backs the guard;
            // losing that race is a conflict, not a duplicate.
            if is_unique_violation(&e) {
                StoreError::Conflict(ConflictKind::AssetNotTransferable)
            } else {
                map_sqlx_error("insert_transfer", e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(transfer)
    }

    async fn transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, asset_id, from_base_id, to_base_id, quantity, status,
                   transfer_date, requested_by, approved_by, notes, created_at, completed_at
            FROM transfers
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_transfer", e))?;

        match row {
            Some(row) => {
                let parsed = TransferRow::from_row(&row).map_err(|e| {
                    StoreError::Storage(format!("failed to decode transfer row: {e}"))
                })?;
                Ok(Some(parsed.into_transfer()?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(transfer_id = %id), err)]
    async fn complete_transfer(
        &self,
        id: TransferId,
        approved_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Transfer, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            UPDATE transfers
            SET status = 'completed', approved_by = $2, completed_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING id, asset_id, from_base_id, to_base_id, quantity, status,
                      transfer_date, requested_by, approved_by, notes, created_at, completed_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(approved_by.as_uuid())
        .bind(at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("complete_transfer", e))?;

        let row = match row {
            Some(row) => row,
            None => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::Conflict(ConflictKind::TransferAlreadyProcessed));
            }
        };
        let parsed = TransferRow::from_row(&row)
            .map_err(|e| StoreError::Storage(format!("failed to decode transfer row: {e}")))?;
        let transfer = parsed.into_transfer()?;

        sqlx::query("UPDATE assets SET current_base_id = $2 WHERE id = $1")
            .bind(transfer.asset.as_uuid())
            .bind(transfer.to_base.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("relocate_asset", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(transfer)
    }

    #[instrument(skip(self), fields(transfer_id = %id), err)]
    async fn cancel_transfer(&self, id: TransferId) -> Result<Transfer, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE transfers
            SET status = 'cancelled'
            WHERE id = $1 AND status = 'pending'
            RETURNING id, asset_id, from_base_id, to_base_id, quantity, status,
                      transfer_date, requested_by, approved_by, notes, created_at, completed_at
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("cancel_transfer", e))?;

        let row = row.ok_or(StoreError::Conflict(ConflictKind::TransferAlreadyProcessed))?;
        let parsed = TransferRow::from_row(&row)
            .map_err(|e| StoreError::Storage(format!("failed to decode transfer row: {e}")))?;
        parsed.into_transfer()
    }

    #[instrument(skip(self, filter), err)]
    async fn transfers(&self, filter: TransferFilter) -> Result<Vec<Transfer>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, asset_id, from_base_id, to_base_id, quantity, status,
                   transfer_date, requested_by, approved_by, notes, created_at, completed_at
            FROM transfers
            WHERE ($1::uuid IS NULL OR from_base_id = $1 OR to_base_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(filter.base.map(|b| *b.as_uuid()))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transfers", e))?;

        let mut transfers = Vec::with_capacity(rows.len());
        for row in rows {
            let parsed = TransferRow::from_row(&row)
                .map_err(|e| StoreError::Storage(format!("failed to decode transfer row: {e}")))?;
            transfers.push(parsed.into_transfer()?);
        }
        Ok(transfers)
    }

    #[instrument(
        skip(self, assignment),
        fields(assignment_id = %assignment.id, asset_id = %assignment.asset),
        err
    )]
    async fn create_assignment(&self, assignment: Assignment) -> Result<Assignment, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let asset = match Self::lock_asset(&mut tx, assignment.asset).await? {
            Some(asset) => asset,
            None => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::NotFound(Entity::Asset));
            }
        };

        if !asset.is_available() || Self::pending_transfer_holds(&mut tx, assignment.asset).await? {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::Conflict(ConflictKind::AssetNotAvailable));
        }

        sqlx::query("UPDATE assets SET status = 'assigned' WHERE id = $1")
            .bind(assignment.asset.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("mark_asset_assigned", e))?;

        sqlx::query(
            r#"
            INSERT INTO assignments (
                id, asset_id, assigned_to, base_id, assigned_by,
                assignment_date, return_date, status, notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(assignment.id.as_uuid())
        .bind(assignment.asset.as_uuid())
        .bind(assignment.assigned_to.as_uuid())
        .bind(assignment.base.as_uuid())
        .bind(assignment.assigned_by.as_uuid())
        .bind(assignment.assignment_date)
        .bind(assignment.return_date)
        .bind(assignment.status.as_str())
        .bind(&assignment.notes)
        .bind(assignment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("assignment {}", assignment.id))
            } else {
                map_sqlx_error("insert_assignment", e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(assignment)
    }

    async fn assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, asset_id, assigned_to, base_id, assigned_by,
                   assignment_date, return_date, status, notes, created_at
            FROM assignments
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_assignment", e))?;

        match row {
            Some(row) => {
                let parsed = AssignmentRow::from_row(&row).map_err(|e| {
                    StoreError::Storage(format!("failed to decode assignment row: {e}"))
                })?;
                Ok(Some(parsed.into_assignment()?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(assignment_id = %id), err)]
    async fn return_assignment(
        &self,
        id: AssignmentId,
        returned_on: NaiveDate,
    ) -> Result<Assignment, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            UPDATE assignments
            SET status = 'returned', return_date = $2
            WHERE id = $1 AND status = 'active'
            RETURNING id, asset_id, assigned_to, base_id, assigned_by,
                      assignment_date, return_date, status, notes, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(returned_on)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("return_assignment", e))?;

        let row = match row {
            Some(row) => row,
            None => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::Conflict(
                    ConflictKind::AssignmentAlreadyReturned,
                ));
            }
        };
        let parsed = AssignmentRow::from_row(&row)
            .map_err(|e| StoreError::Storage(format!("failed to decode assignment row: {e}")))?;
        let assignment = parsed.into_assignment()?;

        sqlx::query("UPDATE assets SET status = 'available' WHERE id = $1")
            .bind(assignment.asset.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("release_asset", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(assignment)
    }

    #[instrument(skip(self, filter), err)]
    async fn assignments(&self, filter: AssignmentFilter) -> Result<Vec<Assignment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT asn.id, asn.asset_id, asn.assigned_to, asn.base_id, asn.assigned_by,
                   asn.assignment_date, asn.return_date, asn.status, asn.notes, asn.created_at
            FROM assignments asn
            JOIN assets a ON a.id = asn.asset_id
            WHERE ($1::uuid IS NULL OR a.current_base_id = $1)
              AND ($2::text IS NULL OR asn.status = $2)
            ORDER BY asn.created_at DESC, asn.id DESC
            "#,
        )
        .bind(filter.base.map(|b| *b.as_uuid()))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_assignments", e))?;

        let mut assignments = Vec::with_capacity(rows.len());
        for row in rows {
            let parsed = AssignmentRow::from_row(&row).map_err(|e| {
                StoreError::Storage(format!("failed to decode assignment row: {e}"))
            })?;
            assignments.push(parsed.into_assignment()?);
        }
        Ok(assignments)
    }

    #[instrument(
        skip(self, expenditure),
        fields(expenditure_id = %expenditure.id, asset_id = %expenditure.asset),
        err
    )]
    async fn insert_expenditure(
        &self,
        expenditure: Expenditure,
    ) -> Result<Expenditure, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        if !Self::base_exists(&mut tx, expenditure.base).await? {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound(Entity::Base));
        }

        let expended = sqlx::query("UPDATE assets SET status = 'expended' WHERE id = $1")
            .bind(expenditure.asset.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("mark_asset_expended", e))?;
        if expended.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound(Entity::Asset));
        }

        sqlx::query(
            r#"
            INSERT INTO expenditures (
                id, asset_id, base_id, quantity, expended_date, reason, recorded_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(expenditure.id.as_uuid())
        .bind(expenditure.asset.as_uuid())
        .bind(expenditure.base.as_uuid())
        .bind(expenditure.quantity as i32)
        .bind(expenditure.expended_date)
        .bind(&expenditure.reason)
        .bind(expenditure.recorded_by.as_uuid())
        .bind(expenditure.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("expenditure {}", expenditure.id))
            } else {
                map_sqlx_error("insert_expenditure", e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(expenditure)
    }

    #[instrument(skip(self), err)]
    async fn count_assets_created_before(
        &self,
        base: Option<BaseId>,
        cutoff: Option<NaiveDate>,
    ) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FROM assets
            WHERE ($1::uuid IS NULL OR current_base_id = $1)
              AND ($2::timestamptz IS NULL OR created_at < $2)
            "#,
        )
        .bind(base.map(|b| *b.as_uuid()))
        .bind(cutoff.map(midnight_utc))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_assets_created_before", e))?;

        decode_count(&row)
    }

    #[instrument(skip(self), err)]
    async fn count_assets_not_expended(&self, base: Option<BaseId>) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FROM assets
            WHERE ($1::uuid IS NULL OR current_base_id = $1)
              AND status <> 'expended'
            "#,
        )
        .bind(base.map(|b| *b.as_uuid()))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_assets_not_expended", e))?;

        decode_count(&row)
    }

    #[instrument(skip(self), err)]
    async fn count_assets_on_assignment(&self, base: Option<BaseId>) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(DISTINCT asn.asset_id)
            FROM assignments asn
            JOIN assets a ON a.id = asn.asset_id
            WHERE asn.status = 'active'
              AND ($1::uuid IS NULL OR a.current_base_id = $1)
            "#,
        )
        .bind(base.map(|b| *b.as_uuid()))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_assets_on_assignment", e))?;

        decode_count(&row)
    }

    #[instrument(skip(self), err)]
    async fn movement_totals(
        &self,
        window: MovementWindow,
    ) -> Result<MovementTotals, StoreError> {
        let base = window.base.map(|b| *b.as_uuid());

        let purchases = sqlx::query(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::bigint FROM purchases
            WHERE ($1::uuid IS NULL OR base_id = $1)
              AND ($2::date IS NULL OR purchase_date >= $2)
              AND ($3::date IS NULL OR purchase_date <= $3)
            "#,
        )
        .bind(base)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sum_purchases", e))
        .and_then(|row| decode_count(&row))?;

        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(quantity) FILTER (WHERE $1::uuid IS NULL OR to_base_id = $1), 0)::bigint AS transfers_in,
                COALESCE(SUM(quantity) FILTER (WHERE $1::uuid IS NULL OR from_base_id = $1), 0)::bigint AS transfers_out
            FROM transfers
            WHERE status = 'completed'
              AND ($2::date IS NULL OR transfer_date >= $2)
              AND ($3::date IS NULL OR transfer_date <= $3)
            "#,
        )
        .bind(base)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sum_transfers", e))?;
        let transfers_in: i64 = row
            .try_get("transfers_in")
            .map_err(|e| StoreError::Storage(format!("failed to decode aggregate: {e}")))?;
        let transfers_out: i64 = row
            .try_get("transfers_out")
            .map_err(|e| StoreError::Storage(format!("failed to decode aggregate: {e}")))?;

        let expended = sqlx::query(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::bigint FROM expenditures
            WHERE ($1::uuid IS NULL OR base_id = $1)
              AND ($2::date IS NULL OR expended_date >= $2)
              AND ($3::date IS NULL OR expended_date <= $3)
            "#,
        )
        .bind(base)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sum_expenditures", e))
        .and_then(|row| decode_count(&row))?;

        Ok(MovementTotals {
            purchases,
            transfers_in: transfers_in as u64,
            transfers_out: transfers_out as u64,
            expended,
        })
    }

    #[instrument(skip(self), err)]
    async fn movement_details(
        &self,
        window: MovementWindow,
    ) -> Result<MovementDetails, StoreError> {
        let base = window.base.map(|b| *b.as_uuid());
        let limit = MOVEMENT_DETAIL_LIMIT as i64;

        let purchase_rows = sqlx::query(
            r#"
            SELECT p.id, p.quantity, p.purchase_date, p.vendor,
                   et.name AS equipment_type, et.category
            FROM purchases p
            JOIN equipment_types et ON et.id = p.equipment_type_id
            WHERE ($1::uuid IS NULL OR p.base_id = $1)
              AND ($2::date IS NULL OR p.purchase_date >= $2)
              AND ($3::date IS NULL OR p.purchase_date <= $3)
            ORDER BY p.purchase_date DESC, p.id DESC
            LIMIT $4
            "#,
        )
        .bind(base)
        .bind(window.start)
        .bind(window.end)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movement_purchases", e))?;

        let mut purchases = Vec::with_capacity(purchase_rows.len());
        for row in purchase_rows {
            purchases.push(decode_purchase_movement(&row)?);
        }

        let inbound_rows = sqlx::query(
            r#"
            SELECT t.id, t.quantity, t.transfer_date, t.notes,
                   b.name AS counterparty_base, et.name AS equipment_type
            FROM transfers t
            JOIN bases b ON b.id = t.from_base_id
            JOIN assets a ON a.id = t.asset_id
            JOIN equipment_types et ON et.id = a.equipment_type_id
            WHERE t.status = 'completed'
              AND ($1::uuid IS NULL OR t.to_base_id = $1)
              AND ($2::date IS NULL OR t.transfer_date >= $2)
              AND ($3::date IS NULL OR t.transfer_date <= $3)
            ORDER BY t.transfer_date DESC, t.id DESC
            LIMIT $4
            "#,
        )
        .bind(base)
        .bind(window.start)
        .bind(window.end)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movement_transfers_in", e))?;

        let outbound_rows = sqlx::query(
            r#"
            SELECT t.id, t.quantity, t.transfer_date, t.notes,
                   b.name AS counterparty_base, et.name AS equipment_type
            FROM transfers t
            JOIN bases b ON b.id = t.to_base_id
            JOIN assets a ON a.id = t.asset_id
            JOIN equipment_types et ON et.id = a.equipment_type_id
            WHERE t.status = 'completed'
              AND ($1::uuid IS NULL OR t.from_base_id = $1)
              AND ($2::date IS NULL OR t.transfer_date >= $2)
              AND ($3::date IS NULL OR t.transfer_date <= $3)
            ORDER BY t.transfer_date DESC, t.id DESC
            LIMIT $4
            "#,
        )
        .bind(base)
        .bind(window.start)
        .bind(window.end)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movement_transfers_out", e))?;

        let mut transfers_in = Vec::with_capacity(inbound_rows.len());
        for row in inbound_rows {
            transfers_in.push(decode_transfer_movement(&row)?);
        }
        let mut transfers_out = Vec::with_capacity(outbound_rows.len());
        for row in outbound_rows {
            transfers_out.push(decode_transfer_movement(&row)?);
        }

        Ok(MovementDetails {
            purchases,
            transfers_in,
            transfers_out,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

struct BaseRow {
    id: uuid::Uuid,
    name: String,
    location: String,
    commander_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for BaseRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(BaseRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            location: row.try_get("location")?,
            commander_id: row.try_get("commander_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<BaseRow> for Base {
    fn from(row: BaseRow) -> Self {
        Base {
            id: BaseId::from_uuid(row.id),
            name: row.name,
            location: row.location,
            commander: row.commander_id.map(UserId::from_uuid),
            created_at: row.created_at,
        }
    }
}

struct EquipmentTypeRow {
    id: uuid::Uuid,
    name: String,
    category: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for EquipmentTypeRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(EquipmentTypeRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<EquipmentTypeRow> for EquipmentType {
    fn from(row: EquipmentTypeRow) -> Self {
        EquipmentType {
            id: EquipmentTypeId::from_uuid(row.id),
            name: row.name,
            category: row.category,
            created_at: row.created_at,
        }
    }
}

struct UserRow {
    id: uuid::Uuid,
    username: String,
    role: String,
    base_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            role: row.try_get("role")?,
            base_id: row.try_get("base_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl UserRow {
    fn into_user(self) -> Result<User, StoreError> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Storage(format!("invalid user row: {e}")))?;
        Ok(User {
            id: UserId::from_uuid(self.id),
            username: self.username,
            role,
            home_base: self.base_id.map(BaseId::from_uuid),
            created_at: self.created_at,
        })
    }
}

struct AssetRow {
    id: uuid::Uuid,
    equipment_type_id: uuid::Uuid,
    current_base_id: uuid::Uuid,
    status: String,
    serial_number: Option<String>,
    purchase_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for AssetRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AssetRow {
            id: row.try_get("id")?,
            equipment_type_id: row.try_get("equipment_type_id")?,
            current_base_id: row.try_get("current_base_id")?,
            status: row.try_get("status")?,
            serial_number: row.try_get("serial_number")?,
            purchase_id: row.try_get("purchase_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl AssetRow {
    fn into_asset(self) -> Result<Asset, StoreError> {
        let status = self
            .status
            .parse::<AssetStatus>()
            .map_err(|e| StoreError::Storage(format!("invalid asset row: {e}")))?;
        Ok(Asset {
            id: AssetId::from_uuid(self.id),
            equipment_type: EquipmentTypeId::from_uuid(self.equipment_type_id),
            current_base: BaseId::from_uuid(self.current_base_id),
            status,
            serial_number: self.serial_number,
            purchase: self.purchase_id.map(PurchaseId::from_uuid),
            created_at: self.created_at,
        })
    }
}

struct PurchaseRow {
    id: uuid::Uuid,
    base_id: uuid::Uuid,
    equipment_type_id: uuid::Uuid,
    quantity: i32,
    unit_cost: Option<i64>,
    total_cost: Option<i64>,
    purchase_date: NaiveDate,
    vendor: Option<String>,
    notes: Option<String>,
    created_by: uuid::Uuid,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for PurchaseRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PurchaseRow {
            id: row.try_get("id")?,
            base_id: row.try_get("base_id")?,
            equipment_type_id: row.try_get("equipment_type_id")?,
            quantity: row.try_get("quantity")?,
            unit_cost: row.try_get("unit_cost")?,
            total_cost: row.try_get("total_cost")?,
            purchase_date: row.try_get("purchase_date")?,
            vendor: row.try_get("vendor")?,
            notes: row.try_get("notes")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl PurchaseRow {
    fn into_purchase(self) -> Purchase {
        Purchase {
            id: PurchaseId::from_uuid(self.id),
            base: BaseId::from_uuid(self.base_id),
            equipment_type: EquipmentTypeId::from_uuid(self.equipment_type_id),
            quantity: self.quantity as u32,
            unit_cost: self.unit_cost.map(|v| v as u64),
            total_cost: self.total_cost.map(|v| v as u64),
            purchase_date: self.purchase_date,
            vendor: self.vendor,
            notes: self.notes,
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

struct TransferRow {
    id: uuid::Uuid,
    asset_id: uuid::Uuid,
    from_base_id: uuid::Uuid,
    to_base_id: uuid::Uuid,
    quantity: i32,
    status: String,
    transfer_date: NaiveDate,
    requested_by: uuid::Uuid,
    approved_by: Option<uuid::Uuid>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for TransferRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransferRow {
            id: row.try_get("id")?,
            asset_id: row.try_get("asset_id")?,
            from_base_id: row.try_get("from_base_id")?,
            to_base_id: row.try_get("to_base_id")?,
            quantity: row.try_get("quantity")?,
            status: row.try_get("status")?,
            transfer_date: row.try_get("transfer_date")?,
            requested_by: row.try_get("requested_by")?,
            approved_by: row.try_get("approved_by")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

impl TransferRow {
    fn into_transfer(self) -> Result<Transfer, StoreError> {
        let status = self
            .status
            .parse::<TransferStatus>()
            .map_err(|e| StoreError::Storage(format!("invalid transfer row: {e}")))?;
        Ok(Transfer {
            id: TransferId::from_uuid(self.id),
            asset: AssetId::from_uuid(self.asset_id),
            from_base: BaseId::from_uuid(self.from_base_id),
            to_base: BaseId::from_uuid(self.to_base_id),
            quantity: self.quantity as u32,
            status,
            transfer_date: self.transfer_date,
            requested_by: UserId::from_uuid(self.requested_by),
            approved_by: self.approved_by.map(UserId::from_uuid),
            notes: self.notes,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

struct AssignmentRow {
    id: uuid::Uuid,
    asset_id: uuid::Uuid,
    assigned_to: uuid::Uuid,
    base_id: uuid::Uuid,
    assigned_by: uuid::Uuid,
    assignment_date: NaiveDate,
    return_date: Option<NaiveDate>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for AssignmentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AssignmentRow {
            id: row.try_get("id")?,
            asset_id: row.try_get("asset_id")?,
            assigned_to: row.try_get("assigned_to")?,
            base_id: row.try_get("base_id")?,
            assigned_by: row.try_get("assigned_by")?,
            assignment_date: row.try_get("assignment_date")?,
            return_date: row.try_get("return_date")?,
            status: row.try_get("status")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl AssignmentRow {
    fn into_assignment(self) -> Result<Assignment, StoreError> {
        let status = self
            .status
            .parse::<AssignmentStatus>()
            .map_err(|e| StoreError::Storage(format!("invalid assignment row: {e}")))?;
        Ok(Assignment {
            id: AssignmentId::from_uuid(self.id),
            asset: AssetId::from_uuid(self.asset_id),
            assigned_to: UserId::from_uuid(self.assigned_to),
            base: BaseId::from_uuid(self.base_id),
            assigned_by: UserId::from_uuid(self.assigned_by),
            assignment_date: self.assignment_date,
            return_date: self.return_date,
            status,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

fn decode_count(row: &PgRow) -> Result<u64, StoreError> {
    let count: i64 = row
        .try_get(0)
        .map_err(|e| StoreError::Storage(format!("failed to decode aggregate: {e}")))?;
    Ok(count as u64)
}

fn decode_purchase_movement(row: &PgRow) -> Result<PurchaseMovement, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Storage(format!("failed to decode movement row: {e}"));
    Ok(PurchaseMovement {
        purchase: PurchaseId::from_uuid(row.try_get("id").map_err(decode)?),
        quantity: row.try_get::<i32, _>("quantity").map_err(decode)? as u32,
        purchase_date: row.try_get("purchase_date").map_err(decode)?,
        vendor: row.try_get("vendor").map_err(decode)?,
        equipment_type: row.try_get("equipment_type").map_err(decode)?,
        category: row.try_get("category").map_err(decode)?,
    })
}

fn decode_transfer_movement(row: &PgRow) -> Result<TransferMovement, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Storage(format!("failed to decode movement row: {e}"));
    Ok(TransferMovement {
        transfer: TransferId::from_uuid(row.try_get("id").map_err(decode)?),
        quantity: row.try_get::<i32, _>("quantity").map_err(decode)? as u32,
        transfer_date: row.try_get("transfer_date").map_err(decode)?,
        counterparty_base: row.try_get("counterparty_base").map_err(decode)?,
        equipment_type: row.try_get("equipment_type").map_err(decode)?,
        notes: row.try_get("notes").map_err(decode)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Schema and error helpers
// ─────────────────────────────────────────────────────────────────────────────

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS bases (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    commander_id UUID,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS equipment_types (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL CHECK (role IN ('admin', 'base_commander', 'logistics_officer')),
    base_id UUID REFERENCES bases(id),
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS purchases (
    id UUID PRIMARY KEY,
    base_id UUID NOT NULL REFERENCES bases(id),
    equipment_type_id UUID NOT NULL REFERENCES equipment_types(id),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    unit_cost BIGINT CHECK (unit_cost >= 0),
    total_cost BIGINT CHECK (total_cost >= 0),
    purchase_date DATE NOT NULL,
    vendor TEXT,
    notes TEXT,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS assets (
    id UUID PRIMARY KEY,
    equipment_type_id UUID NOT NULL REFERENCES equipment_types(id),
    current_base_id UUID NOT NULL REFERENCES bases(id),
    status TEXT NOT NULL CHECK (status IN ('available', 'assigned', 'expended')),
    serial_number TEXT,
    purchase_id UUID REFERENCES purchases(id),
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS transfers (
    id UUID PRIMARY KEY,
    asset_id UUID NOT NULL REFERENCES assets(id),
    from_base_id UUID NOT NULL REFERENCES bases(id),
    to_base_id UUID NOT NULL REFERENCES bases(id),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    status TEXT NOT NULL CHECK (status IN ('pending', 'completed', 'cancelled')),
    transfer_date DATE NOT NULL,
    requested_by UUID NOT NULL,
    approved_by UUID,
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    completed_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS assignments (
    id UUID PRIMARY KEY,
    asset_id UUID NOT NULL REFERENCES assets(id),
    assigned_to UUID NOT NULL,
    base_id UUID NOT NULL REFERENCES bases(id),
    assigned_by UUID NOT NULL,
    assignment_date DATE NOT NULL,
    return_date DATE,
    status TEXT NOT NULL CHECK (status IN ('active', 'returned', 'lost')),
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS expenditures (
    id UUID PRIMARY KEY,
    asset_id UUID NOT NULL REFERENCES assets(id),
    base_id UUID NOT NULL REFERENCES bases(id),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    expended_date DATE NOT NULL,
    reason TEXT,
    recorded_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS transfers_one_pending_per_asset
    ON transfers (asset_id) WHERE status = 'pending';
CREATE INDEX IF NOT EXISTS assets_base_idx ON assets (current_base_id);
CREATE INDEX IF NOT EXISTS assets_status_idx ON assets (status);
CREATE INDEX IF NOT EXISTS purchases_base_date_idx ON purchases (base_id, purchase_date);
CREATE INDEX IF NOT EXISTS transfers_from_base_idx ON transfers (from_base_id, transfer_date);
CREATE INDEX IF NOT EXISTS transfers_to_base_idx ON transfers (to_base_id, transfer_date);
CREATE INDEX IF NOT EXISTS assignments_status_idx ON assignments (status);
CREATE INDEX IF NOT EXISTS expenditures_base_date_idx ON expenditures (base_id, expended_date);
"#;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    "23505" => {
                        // Unique violation
                        StoreError::Duplicate(msg)
                    }
                    "23503" => {
                        // Foreign key violation (callers validate references first)
                        StoreError::Storage(msg)
                    }
                    "23514" => {
                        // Check constraint violation
                        StoreError::Storage(msg)
                    }
                    _ => StoreError::Storage(msg),
                }
            } else {
                StoreError::Storage(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Storage(format!("database error in {}: {}", operation, other)),
    }
}
