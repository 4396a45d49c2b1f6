use chrono::NaiveDate;
use tracing::instrument;

use quartermaster_auth::{CallerContext, ReadScope};
use quartermaster_core::{BaseId, DomainResult};
use quartermaster_reporting::{
    DashboardMetrics, MovementDetails, MovementTotals, MovementWindow,
};

use crate::ledger_store::LedgerStore;

/// Query parameters for the dashboard figures and their drill-down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsQuery {
    pub base: Option<BaseId>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Accepted for interface stability; the balance arithmetic runs over
    /// whole bases, so a type filter would break the reconciliation identity.
    pub equipment_type: Option<String>,
}

/// Read-side aggregator for the dashboard.
///
/// All figures come from the same scoped window, so opening balance, the
/// movement terms and the drill-down rows agree with each other. A caller
/// whose scope resolves to no base gets zeroed figures without touching the
/// store.
pub struct MetricsAggregator<S> {
    store: S,
}

impl<S> MetricsAggregator<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn window(scope: &ReadScope, query: &MetricsQuery) -> MovementWindow {
        MovementWindow::new(scope.base_filter(), query.start, query.end)
    }

    /// Assemble the dashboard figures for the caller's scope.
    #[instrument(skip_all, fields(actor = %caller.user_id), err)]
    pub async fn dashboard(
        &self,
        caller: &CallerContext,
        query: MetricsQuery,
    ) -> DomainResult<DashboardMetrics> {
        let scope = ReadScope::resolve(caller, query.base);
        if scope.is_empty() {
            return Ok(DashboardMetrics::assemble(0, MovementTotals::default(), 0, 0));
        }
        let window = Self::window(&scope, &query);

        let opening = self
            .store
            .count_assets_created_before(window.base, window.start)
            .await?;
        let totals = self.store.movement_totals(window).await?;
        let closing = self.store.count_assets_not_expended(window.base).await?;
        let assigned = self.store.count_assets_on_assignment(window.base).await?;

        Ok(DashboardMetrics::assemble(opening, totals, closing, assigned))
    }

    /// The rows behind the dashboard's movement figures, capped per section.
    /// Runs the same predicates as [`MetricsAggregator::dashboard`] so the
    /// drill-down always reconciles with the figures.
    #[instrument(skip_all, fields(actor = %caller.user_id), err)]
    pub async fn movement_details(
        &self,
        caller: &CallerContext,
        query: MetricsQuery,
    ) -> DomainResult<MovementDetails> {
        let scope = ReadScope::resolve(caller, query.base);
        if scope.is_empty() {
            return Ok(MovementDetails::default());
        }
        let window = Self::window(&scope, &query);
        Ok(self.store.movement_details(window).await?)
    }
}
