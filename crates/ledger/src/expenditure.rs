use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use quartermaster_core::{AssetId, BaseId, ExpenditureId, UserId};

/// Permanent consumption of an asset.
///
/// Recorded by external/manual intervention only; no workflow in this system
/// writes one. The metrics aggregator reads them as the `expended` term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expenditure {
    pub id: ExpenditureId,
    pub asset: AssetId,
    pub base: BaseId,
    pub quantity: u32,
    pub expended_date: NaiveDate,
    pub reason: Option<String>,
    pub recorded_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Expenditure {
    pub fn new(
        asset: AssetId,
        base: BaseId,
        quantity: u32,
        expended_date: NaiveDate,
        recorded_by: UserId,
    ) -> Self {
        Self {
            id: ExpenditureId::new(),
            asset,
            base,
            quantity,
            expended_date,
            reason: None,
            recorded_by,
            created_at: Utc::now(),
        }
    }
}
