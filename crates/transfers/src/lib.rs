//! `quartermaster-transfers` — inter-base transfer state machine.
//!
//! Deterministic domain logic only (no IO, no HTTP, no storage).

pub mod transfer;

pub use transfer::{NewTransfer, Transfer, TransferStatus};
