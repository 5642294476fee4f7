use crate::{EngineError, ResultEngine, Trip, TripId, UserId};

use super::Engine;

/// Rejects mutations on archived trips.
pub fn ensure_writable(trip: &Trip) -> ResultEngine<()> {
    if trip.is_archived() {
        return Err(EngineError::TripArchived);
    }
    Ok(())
}

impl Engine {
    pub(super) async fn load_trip(&self, trip_id: TripId) -> ResultEngine<Trip> {
        self.store
            .trip(trip_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("trip {trip_id}")))
    }

    /// Loads the trip and checks that `actor` currently belongs to it.
    pub(super) async fn require_participant(
        &self,
        trip_id: TripId,
        actor: &UserId,
    ) -> ResultEngine<Trip> {
        let trip = self.load_trip(trip_id).await?;
        if !trip.is_participant(actor) {
            return Err(EngineError::PermissionDenied(format!(
                "{actor} is not a participant of trip {trip_id}"
            )));
        }
        Ok(trip)
    }

    /// Participant check plus the archived guard.
    pub(super) async fn require_writable(
        &self,
        trip_id: TripId,
        actor: &UserId,
    ) -> ResultEngine<Trip> {
        let trip = self.require_participant(trip_id, actor).await?;
        ensure_writable(&trip)?;
        Ok(trip)
    }

    pub(super) async fn require_creator(
        &self,
        trip_id: TripId,
        actor: &UserId,
    ) -> ResultEngine<Trip> {
        let trip = self.load_trip(trip_id).await?;
        if !trip.is_creator(actor) {
            return Err(EngineError::PermissionDenied(format!(
                "only the creator can do this on trip {trip_id}"
            )));
        }
        Ok(trip)
    }
}
