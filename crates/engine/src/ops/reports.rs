use crate::{
    Activity, Countdown, ResultEngine, TripId, TripSummary, UserId,
    summary::{activity_feed, summarize},
};

use super::Engine;

impl Engine {
    /// Retrospective aggregates of the trip, usually shown once it ends.
    pub async fn trip_summary(&self, trip_id: TripId, actor: &UserId) -> ResultEngine<TripSummary> {
        let trip = self.require_participant(trip_id, actor).await?;
        let events = self.store.events_by_trip(trip_id).await?;
        let expenses = self.store.expenses_by_trip(trip_id).await?;
        Ok(summarize(&trip, &events, &expenses))
    }

    /// Time left before the trip starts, or how far into it we are.
    pub async fn trip_countdown(&self, trip_id: TripId, actor: &UserId) -> ResultEngine<Countdown> {
        let trip = self.require_participant(trip_id, actor).await?;
        Ok(trip.countdown(self.store.now()))
    }

    /// Latest `limit` changes to the itinerary and ledger, newest first.
    pub async fn recent_activity(
        &self,
        trip_id: TripId,
        limit: usize,
        actor: &UserId,
    ) -> ResultEngine<Vec<Activity>> {
        self.require_participant(trip_id, actor).await?;
        let events = self.store.events_by_trip(trip_id).await?;
        let expenses = self.store.expenses_by_trip(trip_id).await?;
        Ok(activity_feed(&events, &expenses, limit))
    }
}
