//! `quartermaster-reporting` — dashboard metric definitions.
//!
//! Pure types and arithmetic. The aggregator executing these over a store
//! lives in `quartermaster-infra`.

pub mod metrics;

pub use metrics::{
    DashboardMetrics, MovementDetails, MovementTotals, MovementWindow, PurchaseMovement,
    TransferMovement, MOVEMENT_DETAIL_LIMIT,
};
