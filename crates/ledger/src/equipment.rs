use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quartermaster_core::EquipmentTypeId;

/// Kind of equipment an asset instantiates. Reference data.
///
/// `category` is an opaque grouping label ("weapon", "vehicle", ...); the
/// ledger imposes no vocabulary on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentType {
    pub id: EquipmentTypeId,
    pub name: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl EquipmentType {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: EquipmentTypeId::new(),
            name: name.into(),
            category: category.into(),
            created_at: Utc::now(),
        }
    }
}
