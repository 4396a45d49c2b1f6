//! Integration tests for the full ledger pipeline.
//!
//! Tests: Workflow → AccessPolicy → LedgerStore → AuditSink
//!
//! Verifies:
//! - Each workflow mutation lands atomically and emits one audit event
//! - Role and base rules hold, including the persisted-home rule for
//!   logistics officers
//! - Guarded state changes conflict instead of double-applying
//! - Dashboard figures reconcile with the movements that produced them

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use quartermaster_assignments::NewAssignment;
use quartermaster_audit::{AuditAction, InMemoryAuditSink};
use quartermaster_auth::{CallerContext, Role, User};
use quartermaster_core::{BaseId, ConflictKind, DomainError, EquipmentTypeId, UserId};
use quartermaster_ledger::{AssetStatus, Base, EquipmentType, Expenditure};
use quartermaster_purchasing::{NewPurchase, Purchase, PurchasePatch};
use quartermaster_transfers::{NewTransfer, TransferStatus};

use crate::ledger_store::{
    AssetFilter, AssignmentFilter, InMemoryLedgerStore, LedgerStore, PurchaseFilter,
    TransferFilter,
};
use crate::workflows::{
    AssignmentWorkflow, MetricsAggregator, MetricsQuery, PurchaseWorkflow, TransferWorkflow,
};

type Store = Arc<InMemoryLedgerStore>;
type Audit = Arc<InMemoryAuditSink>;

struct World {
    store: Store,
    audit: Audit,
    purchases: PurchaseWorkflow<Store, Audit>,
    transfers: TransferWorkflow<Store, Audit>,
    assignments: AssignmentWorkflow<Store, Audit>,
    metrics: MetricsAggregator<Store>,
    base_a: BaseId,
    base_b: BaseId,
    rifle: EquipmentTypeId,
    admin: CallerContext,
    commander_a: CallerContext,
    commander_b: CallerContext,
}

async fn world() -> World {
    let store: Store = Arc::new(InMemoryLedgerStore::new());
    let audit: Audit = Arc::new(InMemoryAuditSink::new());

    let base_a = store
        .insert_base(Base::new("Fort Byteward", "northern district"))
        .await
        .unwrap()
        .id;
    let base_b = store
        .insert_base(Base::new("Camp Redline", "southern district"))
        .await
        .unwrap()
        .id;
    let rifle = store
        .insert_equipment_type(EquipmentType::new("5.56mm rifle", "weapon"))
        .await
        .unwrap()
        .id;

    let admin = CallerContext::new(UserId::new(), Role::Admin, None);
    let commander_a = CallerContext::new(UserId::new(), Role::BaseCommander, Some(base_a));
    let commander_b = CallerContext::new(UserId::new(), Role::BaseCommander, Some(base_b));

    World {
        purchases: PurchaseWorkflow::new(store.clone(), audit.clone()),
        transfers: TransferWorkflow::new(store.clone(), audit.clone()),
        assignments: AssignmentWorkflow::new(store.clone(), audit.clone()),
        metrics: MetricsAggregator::new(store.clone()),
        store,
        audit,
        base_a,
        base_b,
        rifle,
        admin,
        commander_a,
        commander_b,
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_purchase(base: BaseId, rifle: EquipmentTypeId, quantity: u32) -> NewPurchase {
    NewPurchase {
        base,
        equipment_type: rifle,
        quantity,
        unit_cost: Some(120_000),
        purchase_date: Utc::now().date_naive(),
        vendor: Some("Northfield Arms".to_string()),
        notes: None,
    }
}

async fn buy(w: &World, caller: &CallerContext, base: BaseId, quantity: u32) -> Purchase {
    w.purchases
        .create(caller, new_purchase(base, w.rifle, quantity))
        .await
        .unwrap()
}

fn assert_conflict(err: DomainError, kind: ConflictKind) {
    match err {
        DomainError::Conflict(actual) => assert_eq!(actual, kind),
        other => panic!("expected conflict {kind:?}, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Purchases
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn purchase_materializes_one_asset_per_unit() {
    let w = world().await;

    let purchase = buy(&w, &w.admin, w.base_a, 3).await;
    assert_eq!(purchase.total_cost, Some(360_000));

    let assets = w
        .store
        .assets(AssetFilter {
            base: Some(w.base_a),
            ..AssetFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(assets.len(), 3);
    for asset in &assets {
        assert_eq!(asset.status, AssetStatus::Available);
        assert_eq!(asset.purchase, Some(purchase.id));
        assert_eq!(asset.equipment_type, w.rifle);
    }

    let actions: Vec<AuditAction> = w.audit.events().iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![AuditAction::CreatePurchase]);
}

#[tokio::test]
async fn commander_purchases_only_for_own_base() {
    let w = world().await;

    let err = w
        .purchases
        .create(&w.commander_a, new_purchase(w.base_b, w.rifle, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));

    // Denied writes leave no rows and no audit trail.
    assert!(w.audit.events().is_empty());
    let listed = w
        .purchases
        .list(&w.admin, PurchaseFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());

    buy(&w, &w.commander_a, w.base_a, 2).await;
}

#[tokio::test]
async fn denied_callers_cannot_probe_reference_ids() {
    let w = world().await;
    let phantom = BaseId::new();

    // A caller without rights on the target base gets the same denial whether
    // the base exists or not.
    let err = w
        .purchases
        .create(&w.commander_a, new_purchase(phantom, w.rifle, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));
    let err = w
        .purchases
        .create(&w.commander_a, new_purchase(w.base_b, w.rifle, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));

    let err = w
        .transfers
        .request(
            &w.commander_b,
            NewTransfer {
                asset: quartermaster_core::AssetId::new(),
                from_base: phantom,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: day(2025, 7, 1),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));

    // An authorized caller still gets the payload diagnosis.
    let err = w
        .purchases
        .create(&w.admin, new_purchase(phantom, w.rifle, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn purchase_rejects_out_of_range_costs() {
    let w = world().await;

    let mut input = new_purchase(w.base_a, w.rifle, 2);
    input.unit_cost = Some(u64::MAX);
    let err = w.purchases.create(&w.admin, input).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    // The update path guards the recomputed total the same way.
    let purchase = buy(&w, &w.admin, w.base_a, 4).await;
    let err = w
        .purchases
        .update(
            &w.admin,
            purchase.id,
            PurchasePatch {
                unit_cost: Some(u64::MAX),
                ..PurchasePatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let untouched = w.store.purchase(purchase.id).await.unwrap().unwrap();
    assert_eq!(untouched.unit_cost, purchase.unit_cost);
    assert_eq!(untouched.total_cost, purchase.total_cost);
}

#[tokio::test]
async fn purchase_update_keeps_unpatched_fields_and_recomputes_total() {
    let w = world().await;
    let purchase = buy(&w, &w.admin, w.base_a, 4).await;

    let updated = w
        .purchases
        .update(
            &w.admin,
            purchase.id,
            PurchasePatch {
                unit_cost: Some(150_000),
                vendor: None,
                notes: Some("price adjusted after inspection".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.unit_cost, Some(150_000));
    assert_eq!(updated.total_cost, Some(600_000));
    assert_eq!(updated.vendor, purchase.vendor);
    assert!(updated.updated_at.is_some());

    let err = w
        .purchases
        .update(&w.commander_b, purchase.id, PurchasePatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));
}

#[tokio::test]
async fn purchase_get_is_denied_outside_scope() {
    let w = world().await;
    let own = buy(&w, &w.admin, w.base_a, 1).await;
    let foreign = buy(&w, &w.admin, w.base_b, 1).await;

    assert!(w.purchases.get(&w.commander_a, own.id).await.is_ok());
    // A foreign purchase is denied, a missing one is not found.
    let err = w
        .purchases
        .get(&w.commander_a, foreign.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));
    let err = w
        .purchases
        .get(&w.admin, quartermaster_core::PurchaseId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    // A requested base filter cannot widen a commander's scope.
    let listed = w
        .purchases
        .list(
            &w.commander_a,
            PurchaseFilter {
                base: Some(w.base_b),
                ..PurchaseFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, own.id);
}

#[tokio::test]
async fn caller_without_home_base_reads_nothing() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 2).await;

    let stray = CallerContext::new(UserId::new(), Role::BaseCommander, None);
    let listed = w
        .purchases
        .list(&stray, PurchaseFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());

    let metrics = w
        .metrics
        .dashboard(&stray, MetricsQuery::default())
        .await
        .unwrap();
    assert_eq!(metrics.opening_balance, 0);
    assert_eq!(metrics.closing_balance, 0);
    assert_eq!(metrics.net_movement, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Transfers
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn approved_transfer_relocates_the_asset() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();

    let transfer = w
        .transfers
        .request(
            &w.commander_a,
            NewTransfer {
                asset: asset.id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: Utc::now().date_naive(),
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(transfer.status, TransferStatus::Pending);

    let approved = w
        .transfers
        .approve(&w.commander_b, transfer.id)
        .await
        .unwrap();
    assert_eq!(approved.status, TransferStatus::Completed);
    assert_eq!(approved.approved_by, Some(w.commander_b.user_id));
    assert!(approved.completed_at.is_some());

    let moved = w.store.asset(asset.id).await.unwrap().unwrap();
    assert_eq!(moved.current_base, w.base_b);
    assert_eq!(moved.status, AssetStatus::Available);
}

#[tokio::test]
async fn only_the_destination_side_approves() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();

    let transfer = w
        .transfers
        .request(
            &w.commander_a,
            NewTransfer {
                asset: asset.id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: Utc::now().date_naive(),
                notes: None,
            },
        )
        .await
        .unwrap();

    let err = w
        .transfers
        .approve(&w.commander_a, transfer.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));

    w.transfers.approve(&w.admin, transfer.id).await.unwrap();
}

#[tokio::test]
async fn officer_transfers_under_their_persisted_base_only() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 2).await;
    let assets = w.store.assets(AssetFilter::default()).await.unwrap();

    // Persisted record says base A. The session claims base B; the
    // directory wins.
    let officer = User::new("lt.farrow", Role::LogisticsOfficer, Some(w.base_a));
    w.store.insert_user(officer.clone()).await.unwrap();
    let caller = CallerContext::new(officer.id, Role::LogisticsOfficer, Some(w.base_b));

    w.transfers
        .request(
            &caller,
            NewTransfer {
                asset: assets[0].id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: Utc::now().date_naive(),
                notes: None,
            },
        )
        .await
        .unwrap();

    // An officer with no persisted record resolves to no base at all.
    let unknown = CallerContext::new(UserId::new(), Role::LogisticsOfficer, Some(w.base_a));
    let err = w
        .transfers
        .request(
            &unknown,
            NewTransfer {
                asset: assets[1].id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: Utc::now().date_naive(),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));
}

#[tokio::test]
async fn pending_transfer_holds_the_asset() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();

    let request = |date| NewTransfer {
        asset: asset.id,
        from_base: w.base_a,
        to_base: w.base_b,
        quantity: 1,
        transfer_date: date,
        notes: None,
    };
    w.transfers
        .request(&w.admin, request(day(2025, 7, 1)))
        .await
        .unwrap();

    let err = w
        .transfers
        .request(&w.admin, request(day(2025, 7, 2)))
        .await
        .unwrap_err();
    assert_conflict(err, ConflictKind::AssetNotTransferable);

    let err = w
        .assignments
        .create(
            &w.commander_a,
            NewAssignment {
                asset: asset.id,
                assigned_to: UserId::new(),
                assignment_date: day(2025, 7, 2),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_conflict(err, ConflictKind::AssetNotAvailable);
}

#[tokio::test]
async fn processed_and_missing_transfers_answer_alike() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();

    let transfer = w
        .transfers
        .request(
            &w.admin,
            NewTransfer {
                asset: asset.id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: day(2025, 7, 1),
                notes: None,
            },
        )
        .await
        .unwrap();
    w.transfers.approve(&w.admin, transfer.id).await.unwrap();

    let repeat = w
        .transfers
        .approve(&w.admin, transfer.id)
        .await
        .unwrap_err();
    assert_conflict(repeat, ConflictKind::TransferAlreadyProcessed);

    let missing = w
        .transfers
        .approve(&w.admin, quartermaster_core::TransferId::new())
        .await
        .unwrap_err();
    assert_conflict(missing, ConflictKind::TransferAlreadyProcessed);

    let cancel_done = w
        .transfers
        .cancel(&w.admin, transfer.id)
        .await
        .unwrap_err();
    assert_conflict(cancel_done, ConflictKind::TransferAlreadyProcessed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_approvals_complete_a_transfer_exactly_once() {
    let w = Arc::new(world().await);
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();

    let transfer = w
        .transfers
        .request(
            &w.admin,
            NewTransfer {
                asset: asset.id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: day(2025, 7, 1),
                notes: None,
            },
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let w = w.clone();
        let id = transfer.id;
        handles.push(tokio::spawn(
            async move { w.transfers.approve(&w.admin, id).await },
        ));
    }

    let mut completed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(approved) => {
                assert_eq!(approved.status, TransferStatus::Completed);
                completed += 1;
            }
            Err(err) => assert_conflict(err, ConflictKind::TransferAlreadyProcessed),
        }
    }
    assert_eq!(completed, 1, "exactly one racer observes the pending state");

    let moved = w.store.asset(asset.id).await.unwrap().unwrap();
    assert_eq!(moved.current_base, w.base_b);
    assert_eq!(w.audit.events().len(), 3, "one purchase, one request, one approval");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_approve_and_cancel_settle_on_one_terminal_state() {
    let w = Arc::new(world().await);
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();

    let transfer = w
        .transfers
        .request(
            &w.admin,
            NewTransfer {
                asset: asset.id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: day(2025, 7, 1),
                notes: None,
            },
        )
        .await
        .unwrap();

    let approver = {
        let w = w.clone();
        let id = transfer.id;
        tokio::spawn(async move { w.transfers.approve(&w.admin, id).await })
    };
    let canceller = {
        let w = w.clone();
        let id = transfer.id;
        tokio::spawn(async move { w.transfers.cancel(&w.admin, id).await })
    };
    let approve = approver.await.unwrap();
    let cancel = canceller.await.unwrap();

    assert!(
        approve.is_ok() != cancel.is_ok(),
        "exactly one of the racers wins: approve={approve:?} cancel={cancel:?}"
    );

    let settled = w.store.transfer(transfer.id).await.unwrap().unwrap();
    let moved = w.store.asset(asset.id).await.unwrap().unwrap();
    match settled.status {
        TransferStatus::Completed => assert_eq!(moved.current_base, w.base_b),
        TransferStatus::Cancelled => {
            assert_eq!(moved.current_base, w.base_a);
            assert_eq!(moved.status, AssetStatus::Available);
        }
        TransferStatus::Pending => panic!("race left the transfer pending"),
    }
    let loser = if approve.is_ok() {
        cancel.unwrap_err()
    } else {
        approve.unwrap_err()
    };
    assert_conflict(loser, ConflictKind::TransferAlreadyProcessed);
}

#[tokio::test]
async fn cancelled_transfer_releases_the_asset() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();

    let request = |date| NewTransfer {
        asset: asset.id,
        from_base: w.base_a,
        to_base: w.base_b,
        quantity: 1,
        transfer_date: date,
        notes: None,
    };
    let transfer = w
        .transfers
        .request(&w.admin, request(day(2025, 7, 1)))
        .await
        .unwrap();
    let cancelled = w.transfers.cancel(&w.admin, transfer.id).await.unwrap();
    assert_eq!(cancelled.status, TransferStatus::Cancelled);
    assert!(cancelled.completed_at.is_none());

    let still_home = w.store.asset(asset.id).await.unwrap().unwrap();
    assert_eq!(still_home.current_base, w.base_a);

    // The asset is free for a new movement.
    w.transfers
        .request(&w.admin, request(day(2025, 7, 3)))
        .await
        .unwrap();
}

#[tokio::test]
async fn transfer_lists_cover_both_sides_of_a_base() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();

    let transfer = w
        .transfers
        .request(
            &w.admin,
            NewTransfer {
                asset: asset.id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: day(2025, 7, 1),
                notes: None,
            },
        )
        .await
        .unwrap();
    w.transfers.approve(&w.admin, transfer.id).await.unwrap();

    for caller in [&w.commander_a, &w.commander_b] {
        let seen = w
            .transfers
            .list(caller, TransferFilter::default())
            .await
            .unwrap();
        assert_eq!(seen.len(), 1, "both sides see the movement");
        assert_eq!(seen[0].id, transfer.id);
        assert!(w.transfers.get(caller, transfer.id).await.is_ok());
    }

    // A base with no stake in the movement reads it as missing.
    let bystander = CallerContext::new(
        UserId::new(),
        Role::BaseCommander,
        Some(
            w.store
                .insert_base(Base::new("Station Quiet", "eastern district"))
                .await
                .unwrap()
                .id,
        ),
    );
    let err = w.transfers.get(&bystander, transfer.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let completed_only = w
        .transfers
        .list(
            &w.admin,
            TransferFilter {
                status: Some(TransferStatus::Completed),
                ..TransferFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(completed_only.len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Assignments
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn assignment_round_trip_flips_asset_status() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();
    let soldier = UserId::new();

    let assignment = w
        .assignments
        .create(
            &w.commander_a,
            NewAssignment {
                asset: asset.id,
                assigned_to: soldier,
                assignment_date: day(2025, 7, 1),
                notes: Some("field exercise".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(assignment.base, w.base_a);

    let held = w.store.asset(asset.id).await.unwrap().unwrap();
    assert_eq!(held.status, AssetStatus::Assigned);

    let double = w
        .assignments
        .create(
            &w.commander_a,
            NewAssignment {
                asset: asset.id,
                assigned_to: UserId::new(),
                assignment_date: day(2025, 7, 2),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_conflict(double, ConflictKind::AssetNotAvailable);

    let returned = w
        .assignments
        .return_asset(&w.commander_a, assignment.id)
        .await
        .unwrap();
    assert_eq!(returned.return_date, Some(Utc::now().date_naive()));

    let released = w.store.asset(asset.id).await.unwrap().unwrap();
    assert_eq!(released.status, AssetStatus::Available);

    let repeat = w
        .assignments
        .return_asset(&w.commander_a, assignment.id)
        .await
        .unwrap_err();
    assert_conflict(repeat, ConflictKind::AssignmentAlreadyReturned);
}

#[tokio::test]
async fn assigned_asset_refuses_transfer() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();

    w.assignments
        .create(
            &w.commander_a,
            NewAssignment {
                asset: asset.id,
                assigned_to: UserId::new(),
                assignment_date: day(2025, 7, 1),
                notes: None,
            },
        )
        .await
        .unwrap();

    let err = w
        .transfers
        .request(
            &w.admin,
            NewTransfer {
                asset: asset.id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: day(2025, 7, 2),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_conflict(err, ConflictKind::AssetNotTransferable);
}

#[tokio::test]
async fn assignment_lists_follow_the_asset() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 2).await;
    let assets = w.store.assets(AssetFilter::default()).await.unwrap();

    for asset in &assets {
        w.assignments
            .create(
                &w.commander_a,
                NewAssignment {
                    asset: asset.id,
                    assigned_to: UserId::new(),
                    assignment_date: day(2025, 7, 1),
                    notes: None,
                },
            )
            .await
            .unwrap();
    }

    let at_a = w
        .assignments
        .list(&w.commander_a, AssignmentFilter::default())
        .await
        .unwrap();
    assert_eq!(at_a.len(), 2);

    let at_b = w
        .assignments
        .list(&w.commander_b, AssignmentFilter::default())
        .await
        .unwrap();
    assert!(at_b.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Dashboard
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_reconciles_when_all_movement_is_in_window() {
    let w = world().await;
    let today = Utc::now().date_naive();

    buy(&w, &w.admin, w.base_a, 5).await;
    let assets = w
        .store
        .assets(AssetFilter {
            base: Some(w.base_a),
            ..AssetFilter::default()
        })
        .await
        .unwrap();

    // One asset leaves by transfer, one by expenditure, one goes on loan.
    let transfer = w
        .transfers
        .request(
            &w.admin,
            NewTransfer {
                asset: assets[0].id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: today,
                notes: None,
            },
        )
        .await
        .unwrap();
    w.transfers.approve(&w.admin, transfer.id).await.unwrap();

    w.store
        .insert_expenditure(Expenditure::new(
            assets[1].id,
            w.base_a,
            1,
            today,
            UserId::new(),
        ))
        .await
        .unwrap();

    w.assignments
        .create(
            &w.commander_a,
            NewAssignment {
                asset: assets[2].id,
                assigned_to: UserId::new(),
                assignment_date: today,
                notes: None,
            },
        )
        .await
        .unwrap();

    let query = MetricsQuery {
        base: Some(w.base_a),
        start: Some(today.pred_opt().unwrap()),
        end: Some(today),
        equipment_type: None,
    };
    let metrics = w.metrics.dashboard(&w.admin, query).await.unwrap();

    assert_eq!(metrics.opening_balance, 0);
    assert_eq!(metrics.purchases, 5);
    assert_eq!(metrics.transfers_in, 0);
    assert_eq!(metrics.transfers_out, 1);
    assert_eq!(metrics.expended, 1);
    assert_eq!(metrics.net_movement, 3);
    assert_eq!(metrics.closing_balance, 3);
    assert_eq!(metrics.assigned_assets, 1);
    assert_eq!(
        metrics.closing_balance as i64,
        metrics.opening_balance as i64 + metrics.net_movement,
    );

    // The receiving side sees the same movement as inbound.
    let other_side = w
        .metrics
        .dashboard(
            &w.commander_b,
            MetricsQuery {
                start: Some(today.pred_opt().unwrap()),
                end: Some(today),
                ..MetricsQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(other_side.transfers_in, 1);
    assert_eq!(other_side.transfers_out, 0);
    assert_eq!(other_side.closing_balance, 1);
}

#[tokio::test]
async fn opening_balance_counts_assets_created_before_the_window() {
    let w = world().await;
    let today = Utc::now().date_naive();
    let tomorrow = today.succ_opt().unwrap();

    buy(&w, &w.admin, w.base_a, 4).await;

    // A window starting tomorrow has every asset on the opening side and no
    // movement inside.
    let metrics = w
        .metrics
        .dashboard(
            &w.admin,
            MetricsQuery {
                base: Some(w.base_a),
                start: Some(tomorrow),
                end: Some(tomorrow),
                equipment_type: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(metrics.opening_balance, 4);
    assert_eq!(metrics.purchases, 0);
    assert_eq!(metrics.net_movement, 0);
    assert_eq!(metrics.closing_balance, 4);
}

#[tokio::test]
async fn equipment_type_filter_does_not_skew_balances() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 3).await;

    let plain = w
        .metrics
        .dashboard(
            &w.admin,
            MetricsQuery {
                base: Some(w.base_a),
                ..MetricsQuery::default()
            },
        )
        .await
        .unwrap();
    let typed = w
        .metrics
        .dashboard(
            &w.admin,
            MetricsQuery {
                base: Some(w.base_a),
                equipment_type: Some("no such type".to_string()),
                ..MetricsQuery::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(plain, typed);
}

#[tokio::test]
async fn movement_details_mirror_the_totals() {
    let w = world().await;
    let today = Utc::now().date_naive();

    buy(&w, &w.admin, w.base_a, 2).await;
    let assets = w.store.assets(AssetFilter::default()).await.unwrap();
    let transfer = w
        .transfers
        .request(
            &w.admin,
            NewTransfer {
                asset: assets[0].id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: today,
                notes: Some("rebalancing stock".to_string()),
            },
        )
        .await
        .unwrap();
    w.transfers.approve(&w.admin, transfer.id).await.unwrap();

    let query = MetricsQuery {
        base: Some(w.base_a),
        ..MetricsQuery::default()
    };
    let metrics = w.metrics.dashboard(&w.admin, query.clone()).await.unwrap();
    let details = w.metrics.movement_details(&w.admin, query).await.unwrap();

    let purchased: u64 = details.purchases.iter().map(|p| u64::from(p.quantity)).sum();
    assert_eq!(purchased, metrics.purchases);
    let outbound: u64 = details
        .transfers_out
        .iter()
        .map(|t| u64::from(t.quantity))
        .sum();
    assert_eq!(outbound, metrics.transfers_out);
    assert!(details.transfers_in.is_empty());

    assert_eq!(details.purchases[0].equipment_type, "5.56mm rifle");
    assert_eq!(details.transfers_out[0].counterparty_base, "Camp Redline");
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit trail
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_mutation_leaves_exactly_one_audit_event() {
    let w = world().await;
    buy(&w, &w.admin, w.base_a, 1).await;
    let asset = w.store.assets(AssetFilter::default()).await.unwrap()[0].clone();

    let transfer = w
        .transfers
        .request(
            &w.commander_a,
            NewTransfer {
                asset: asset.id,
                from_base: w.base_a,
                to_base: w.base_b,
                quantity: 1,
                transfer_date: day(2025, 7, 1),
                notes: None,
            },
        )
        .await
        .unwrap();
    w.transfers.approve(&w.commander_b, transfer.id).await.unwrap();

    let events = w.audit.events();
    let actions: Vec<AuditAction> = events.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::CreatePurchase,
            AuditAction::CreateTransfer,
            AuditAction::ApproveTransfer,
        ],
    );

    assert_eq!(events[1].actor, w.commander_a.user_id);
    assert_eq!(events[1].record_id, *transfer.id.as_uuid());
    assert_eq!(events[1].table, "transfers");
    assert!(events[1].payload.is_object());

    // Conflicted mutations add nothing.
    let _ = w.transfers.approve(&w.commander_b, transfer.id).await;
    assert_eq!(w.audit.events().len(), 3);
}
