use std::sync::Arc;

use anyhow::Context;

use quartermaster_audit::{AuditSink, TracingAuditSink};
use quartermaster_infra::ledger_store::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore};
use quartermaster_infra::workflows::{
    AssignmentWorkflow, MetricsAggregator, PurchaseWorkflow, TransferWorkflow,
};

/// Store handle every workflow shares.
pub type SharedStore = Arc<dyn LedgerStore>;
/// Audit handle every workflow shares.
pub type SharedAudit = Arc<dyn AuditSink>;

/// The wired workflows handed to every handler.
pub struct AppServices {
    pub purchases: PurchaseWorkflow<SharedStore, SharedAudit>,
    pub transfers: TransferWorkflow<SharedStore, SharedAudit>,
    pub assignments: AssignmentWorkflow<SharedStore, SharedAudit>,
    pub metrics: MetricsAggregator<SharedStore>,
}

impl AppServices {
    /// Wire every workflow over one store and one audit sink.
    pub fn new(store: SharedStore, audit: SharedAudit) -> Self {
        Self {
            purchases: PurchaseWorkflow::new(store.clone(), audit.clone()),
            transfers: TransferWorkflow::new(store.clone(), audit.clone()),
            assignments: AssignmentWorkflow::new(store.clone(), audit),
            metrics: MetricsAggregator::new(store),
        }
    }
}

/// Select the store backend from the environment and wire the services.
///
/// With `DATABASE_URL` set the service runs on Postgres, ensuring the ledger
/// schema on startup. Without it the in-memory store is used, which suits
/// dev and tests only.
pub async fn build_services() -> anyhow::Result<AppServices> {
    let store: SharedStore = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PostgresLedgerStore::connect(&url)
                .await
                .context("failed to connect to Postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to ensure the ledger schema")?;
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set; using the in-memory store (state is lost on restart)"
            );
            Arc::new(InMemoryLedgerStore::new())
        }
    };

    let audit: SharedAudit = Arc::new(TracingAuditSink::new());
    Ok(AppServices::new(store, audit))
}
