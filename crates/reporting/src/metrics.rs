use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use quartermaster_core::{BaseId, PurchaseId, TransferId};

/// Maximum rows returned per movement-detail section.
pub const MOVEMENT_DETAIL_LIMIT: usize = 50;

/// Filter window the aggregate figures and the drill-down share.
///
/// Both views of a movement must be built from the same predicates, so the
/// predicates live here and nowhere else. A missing bound relaxes the
/// corresponding comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementWindow {
    pub base: Option<BaseId>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl MovementWindow {
    pub fn new(base: Option<BaseId>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { base, start, end }
    }

    /// Whether a business date falls inside the window (inclusive bounds).
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }

    /// Whether a row at `base` is in scope.
    pub fn covers_base(&self, base: BaseId) -> bool {
        self.base.is_none_or(|b| b == base)
    }
}

/// Movement sums over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementTotals {
    pub purchases: u64,
    pub transfers_in: u64,
    pub transfers_out: u64,
    pub expended: u64,
}

impl MovementTotals {
    /// `purchases + transfers_in − transfers_out − expended`. Negative when
    /// more left the scope than entered it.
    pub fn net_movement(&self) -> i64 {
        self.purchases as i64 + self.transfers_in as i64
            - self.transfers_out as i64
            - self.expended as i64
    }
}

/// The dashboard figures.
///
/// `opening_balance` counts assets created strictly before the window opens
/// and is a creation-time snapshot, not an accounting opening balance;
/// `closing_balance` is a current snapshot of non-expended assets with no
/// date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub opening_balance: u64,
    pub purchases: u64,
    pub transfers_in: u64,
    pub transfers_out: u64,
    pub net_movement: i64,
    pub closing_balance: u64,
    pub assigned_assets: u64,
    pub expended: u64,
}

impl DashboardMetrics {
    pub fn assemble(
        opening_balance: u64,
        totals: MovementTotals,
        closing_balance: u64,
        assigned_assets: u64,
    ) -> Self {
        Self {
            opening_balance,
            purchases: totals.purchases,
            transfers_in: totals.transfers_in,
            transfers_out: totals.transfers_out,
            net_movement: totals.net_movement(),
            closing_balance,
            assigned_assets,
            expended: totals.expended,
        }
    }
}

/// One purchase row in the drill-down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseMovement {
    pub purchase: PurchaseId,
    pub quantity: u32,
    pub purchase_date: NaiveDate,
    pub vendor: Option<String>,
    pub equipment_type: String,
    pub category: String,
}

/// One completed transfer row in the drill-down. `counterparty_base` names
/// the sending base for inbound rows and the receiving base for outbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMovement {
    pub transfer: TransferId,
    pub quantity: u32,
    pub transfer_date: NaiveDate,
    pub counterparty_base: String,
    pub equipment_type: String,
    pub notes: Option<String>,
}

/// Drill-down rows behind the aggregate figures, newest first, at most
/// [`MOVEMENT_DETAIL_LIMIT`] per section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDetails {
    pub purchases: Vec<PurchaseMovement>,
    pub transfers_in: Vec<TransferMovement>,
    pub transfers_out: Vec<TransferMovement>,
}
