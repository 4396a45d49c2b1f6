//! `quartermaster-assignments` — personnel assignment state machine.
//!
//! Deterministic domain logic only (no IO, no HTTP, no storage).

pub mod assignment;

pub use assignment::{Assignment, AssignmentStatus, NewAssignment};
