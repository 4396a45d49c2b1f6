//! `quartermaster-purchasing` — purchase records and asset materialization.
//!
//! Deterministic domain logic only (no IO, no HTTP, no storage).

pub mod purchase;

pub use purchase::{NewPurchase, Purchase, PurchasePatch};
