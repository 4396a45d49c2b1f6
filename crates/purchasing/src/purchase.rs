use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use quartermaster_core::{BaseId, DomainError, DomainResult, EquipmentTypeId, PurchaseId, UserId};
use quartermaster_ledger::Asset;

/// Procurement of `quantity` identical assets for one base.
///
/// Immutable once created except for unit cost, vendor and notes; the total
/// cost follows the unit cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub base: BaseId,
    pub equipment_type: EquipmentTypeId,
    pub quantity: u32,
    /// Cost per asset in the smallest currency unit (cents).
    pub unit_cost: Option<u64>,
    /// `unit_cost × quantity`; absent whenever the unit cost is absent.
    pub total_cost: Option<u64>,
    pub purchase_date: NaiveDate,
    pub vendor: Option<String>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchase {
    pub base: BaseId,
    pub equipment_type: EquipmentTypeId,
    pub quantity: u32,
    pub unit_cost: Option<u64>,
    pub purchase_date: NaiveDate,
    pub vendor: Option<String>,
    pub notes: Option<String>,
}

impl NewPurchase {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity == 0 {
            return Err(DomainError::validation(
                "quantity must be greater than zero",
            ));
        }
        total_cost(self.unit_cost, self.quantity)?;
        Ok(())
    }
}

/// Patch for the mutable purchase fields. `None` keeps the current value;
/// no field can be cleared back to absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasePatch {
    pub unit_cost: Option<u64>,
    pub vendor: Option<String>,
    pub notes: Option<String>,
}

impl PurchasePatch {
    /// Check the patched unit cost against the purchase's quantity before
    /// anything is written.
    pub fn validate_for(&self, quantity: u32) -> DomainResult<()> {
        total_cost(self.unit_cost, quantity)?;
        Ok(())
    }
}

/// Costs are stored in signed 64-bit columns; the total must fit one.
const MAX_TOTAL_COST: u64 = i64::MAX as u64;

fn total_cost(unit_cost: Option<u64>, quantity: u32) -> DomainResult<Option<u64>> {
    match unit_cost {
        None => Ok(None),
        Some(unit) => unit
            .checked_mul(u64::from(quantity))
            .filter(|total| *total <= MAX_TOTAL_COST)
            .map(Some)
            .ok_or_else(|| DomainError::validation("total cost is out of range")),
    }
}

impl Purchase {
    /// Validate the input and materialize the purchase together with exactly
    /// `quantity` available assets at the purchase's base, each linked back
    /// to the purchase.
    pub fn create(input: NewPurchase, created_by: UserId) -> DomainResult<(Purchase, Vec<Asset>)> {
        input.validate()?;

        let purchase = Purchase {
            id: PurchaseId::new(),
            base: input.base,
            equipment_type: input.equipment_type,
            quantity: input.quantity,
            unit_cost: input.unit_cost,
            total_cost: total_cost(input.unit_cost, input.quantity)?,
            purchase_date: input.purchase_date,
            vendor: input.vendor,
            notes: input.notes,
            created_by,
            created_at: Utc::now(),
            updated_at: None,
        };

        let assets = (0..purchase.quantity)
            .map(|_| {
                let mut asset = Asset::new(purchase.equipment_type, purchase.base);
                asset.purchase = Some(purchase.id);
                asset
            })
            .collect();

        Ok((purchase, assets))
    }

    /// Apply a patch to the mutable fields, recomputing the total cost when
    /// the unit cost changes. A unit cost whose total falls out of range
    /// fails the patch and leaves the purchase untouched.
    pub fn apply_patch(&mut self, patch: PurchasePatch) -> DomainResult<()> {
        if let Some(unit_cost) = patch.unit_cost {
            self.total_cost = total_cost(Some(unit_cost), self.quantity)?;
            self.unit_cost = Some(unit_cost);
        }
        if let Some(vendor) = patch.vendor {
            self.vendor = Some(vendor);
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        self.updated_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quartermaster_ledger::AssetStatus;

    fn test_input(quantity: u32) -> NewPurchase {
        NewPurchase {
            base: BaseId::new(),
            equipment_type: EquipmentTypeId::new(),
            quantity,
            unit_cost: None,
            purchase_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            vendor: None,
            notes: None,
        }
    }

    #[test]
    fn create_materializes_exactly_quantity_assets() {
        let input = test_input(3);
        let base = input.base;
        let (purchase, assets) = Purchase::create(input, UserId::new()).unwrap();

        assert_eq!(assets.len(), 3);
        for asset in &assets {
            assert_eq!(asset.status, AssetStatus::Available);
            assert_eq!(asset.current_base, base);
            assert_eq!(asset.purchase, Some(purchase.id));
            assert_eq!(asset.equipment_type, purchase.equipment_type);
        }
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = Purchase::create(test_input(0), UserId::new()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn total_cost_follows_unit_cost() {
        let mut input = test_input(4);
        input.unit_cost = Some(2_500);
        let (purchase, _) = Purchase::create(input, UserId::new()).unwrap();
        assert_eq!(purchase.total_cost, Some(10_000));
    }

    #[test]
    fn total_cost_absent_without_unit_cost() {
        let (purchase, _) = Purchase::create(test_input(4), UserId::new()).unwrap();
        assert_eq!(purchase.total_cost, None);
    }

    #[test]
    fn patch_keeps_fields_it_does_not_name() {
        let mut input = test_input(2);
        input.vendor = Some("Northrop Logistics".into());
        input.unit_cost = Some(1_000);
        let (mut purchase, _) = Purchase::create(input, UserId::new()).unwrap();

        purchase
            .apply_patch(PurchasePatch {
                notes: Some("delivered to armory".into()),
                ..PurchasePatch::default()
            })
            .unwrap();

        assert_eq!(purchase.vendor.as_deref(), Some("Northrop Logistics"));
        assert_eq!(purchase.unit_cost, Some(1_000));
        assert_eq!(purchase.total_cost, Some(2_000));
        assert_eq!(purchase.notes.as_deref(), Some("delivered to armory"));
        assert!(purchase.updated_at.is_some());
    }

    #[test]
    fn patch_recomputes_total_on_unit_cost_change() {
        let mut input = test_input(5);
        input.unit_cost = Some(100);
        let (mut purchase, _) = Purchase::create(input, UserId::new()).unwrap();
        assert_eq!(purchase.total_cost, Some(500));

        purchase
            .apply_patch(PurchasePatch {
                unit_cost: Some(300),
                ..PurchasePatch::default()
            })
            .unwrap();
        assert_eq!(purchase.total_cost, Some(1_500));
    }

    #[test]
    fn overflowing_total_cost_is_rejected() {
        let mut input = test_input(2);
        input.unit_cost = Some(u64::MAX);
        let err = Purchase::create(input, UserId::new()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn total_cost_beyond_storage_range_is_rejected() {
        // The product fits a u64 but not the signed column it lands in.
        let mut input = test_input(1);
        input.unit_cost = Some(u64::MAX);
        let err = Purchase::create(input, UserId::new()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn patch_with_overflowing_unit_cost_leaves_the_purchase_untouched() {
        let mut input = test_input(3);
        input.unit_cost = Some(1_000);
        let (mut purchase, _) = Purchase::create(input, UserId::new()).unwrap();
        let before = purchase.clone();

        let err = purchase
            .apply_patch(PurchasePatch {
                unit_cost: Some(u64::MAX),
                vendor: Some("should not land".into()),
                ..PurchasePatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(purchase, before);
    }

    proptest! {
        /// Property: materialization always yields exactly `quantity` assets
        /// and a total that is the unit cost times the quantity.
        #[test]
        fn materialization_count_and_total_hold(
            quantity in 1u32..500,
            unit_cost in proptest::option::of(1u64..1_000_000),
        ) {
            let mut input = test_input(quantity);
            input.unit_cost = unit_cost;
            let (purchase, assets) = Purchase::create(input, UserId::new()).unwrap();

            prop_assert_eq!(assets.len(), quantity as usize);
            prop_assert_eq!(
                purchase.total_cost,
                unit_cost.map(|u| u * u64::from(quantity))
            );
        }
    }
}
