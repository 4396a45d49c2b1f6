//! Store-backed user directory.

use async_trait::async_trait;

use quartermaster_auth::{DirectoryError, UserDirectory};
use quartermaster_core::{BaseId, UserId};

use crate::ledger_store::LedgerStore;

/// [`UserDirectory`] that resolves home bases from the users table of a
/// [`LedgerStore`].
///
/// An unknown user resolves to `Ok(None)`, not an error: identity arrives
/// from the gateway and may not have a persisted record here. Only a failed
/// lookup is a [`DirectoryError`].
#[derive(Debug, Clone)]
pub struct StoreUserDirectory<S> {
    store: S,
}

impl<S> StoreUserDirectory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> UserDirectory for StoreUserDirectory<S>
where
    S: LedgerStore,
{
    async fn home_base_of(&self, user: UserId) -> Result<Option<BaseId>, DirectoryError> {
        let record = self
            .store
            .user(user)
            .await
            .map_err(|e| DirectoryError(e.to_string()))?;
        Ok(record.and_then(|u| u.home_base))
    }
}
