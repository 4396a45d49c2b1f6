//! `quartermaster-ledger` — asset ledger entities.
//!
//! Pure domain records: assets and the reference data they hang off. Status
//! transitions live here; everything that persists or queries them lives in
//! `quartermaster-infra`.

pub mod asset;
pub mod base;
pub mod equipment;
pub mod expenditure;

pub use asset::{Asset, AssetStatus};
pub use base::Base;
pub use equipment::EquipmentType;
pub use expenditure::Expenditure;
