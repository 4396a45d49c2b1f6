use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quartermaster_core::{
    AssetId, BaseId, ConflictKind, DomainError, DomainResult, EquipmentTypeId, PurchaseId,
};

/// Lifecycle status of a tracked asset.
///
/// `expended` is terminal and reached only by external intervention; no
/// workflow in this system produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Available,
    Assigned,
    Expended,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Available => "available",
            AssetStatus::Assigned => "assigned",
            AssetStatus::Expended => "expended",
        }
    }
}

impl core::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(AssetStatus::Available),
            "assigned" => Ok(AssetStatus::Assigned),
            "expended" => Ok(AssetStatus::Expended),
            other => Err(DomainError::validation(format!(
                "unknown asset status '{other}'"
            ))),
        }
    }
}

/// One physical piece of equipment on the ledger.
///
/// Invariant: `current_base` always names the destination of the asset's
/// most recently completed transfer, or the purchase base if it never moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub equipment_type: EquipmentTypeId,
    pub current_base: BaseId,
    pub status: AssetStatus,
    pub serial_number: Option<String>,
    /// Purchase that materialized this asset, when it entered through one.
    pub purchase: Option<PurchaseId>,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn new(equipment_type: EquipmentTypeId, base: BaseId) -> Self {
        Self {
            id: AssetId::new(),
            equipment_type,
            current_base: base,
            status: AssetStatus::Available,
            serial_number: None,
            purchase: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == AssetStatus::Available
    }

    /// Hand the asset to personnel. Only an `available` asset can be taken.
    pub fn assign(&mut self) -> DomainResult<()> {
        if self.status != AssetStatus::Available {
            return Err(DomainError::conflict(ConflictKind::AssetNotAvailable));
        }
        self.status = AssetStatus::Assigned;
        Ok(())
    }

    /// Put the asset back into the available pool.
    pub fn release(&mut self) {
        self.status = AssetStatus::Available;
    }

    /// Consume the asset permanently. External intervention only.
    pub fn expend(&mut self) {
        self.status = AssetStatus::Expended;
    }

    /// Move the asset to another base (completed transfer).
    pub fn relocate(&mut self, to: BaseId) {
        self.current_base = to;
    }
}
