use std::collections::BTreeSet;

use crate::{BalanceReport, ResultEngine, TripId, UserId, compute_balances};

use super::Engine;

impl Engine {
    /// Balances of the trip as currently stored.
    ///
    /// Recomputed from scratch on every call; the report depends only on the
    /// ledger and membership snapshots read here.
    pub async fn trip_balances(&self, trip_id: TripId, actor: &UserId) -> ResultEngine<BalanceReport> {
        let trip = self.require_participant(trip_id, actor).await?;
        self.balances_of(trip_id, &trip.participants).await
    }

    async fn balances_of(
        &self,
        trip_id: TripId,
        participants: &BTreeSet<UserId>,
    ) -> ResultEngine<BalanceReport> {
        let expenses = self.store.expenses_by_trip(trip_id).await?;
        let report = compute_balances(&expenses, participants, &self.settings.balance_policy());
        tracing::debug!(
            %trip_id,
            expenses = expenses.len(),
            total_paid = %report.total_paid,
            "balances recomputed"
        );
        Ok(report)
    }
}
