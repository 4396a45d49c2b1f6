//! Infrastructure layer: storage backends, workflow orchestration, directory lookups.

pub mod directory;
pub mod ledger_store;
pub mod workflows;

#[cfg(test)]
mod integration_tests;
