//! Trip lifecycle: `Active -> Archived`, one way. Archived trips are
//! read-only; deleting a trip cascades to everything it owns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, NewTrip, ResultEngine, Trip, TripId, TripPatch, TripStatus, UserId,
    ValidationError,
    util::{normalize_optional_text, normalize_required_text},
};

use super::{Engine, access::ensure_writable};

/// Trips of one user, each list in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripList {
    pub active: Vec<Trip>,
    pub archived: Vec<Trip>,
}

fn check_dates(starts_on: Option<NaiveDate>, ends_on: Option<NaiveDate>) -> ResultEngine<()> {
    match (starts_on, ends_on) {
        (Some(start), Some(end)) if end < start => {
            Err(ValidationError::InvalidDates(format!("{end} is before {start}")).into())
        }
        _ => Ok(()),
    }
}

impl Engine {
    /// Creates an active trip whose only participant is `actor`.
    pub async fn create_trip(&self, new_trip: NewTrip, actor: &UserId) -> ResultEngine<Trip> {
        let name = normalize_required_text(&new_trip.name, "name")?;
        let destination = normalize_required_text(&new_trip.destination, "destination")?;
        check_dates(new_trip.starts_on, new_trip.ends_on)?;

        let mut trip = Trip::new(name, destination, actor.clone(), self.store.now());
        trip.description = normalize_optional_text(new_trip.description.as_deref());
        trip.currency = new_trip.currency;
        trip.starts_on = new_trip.starts_on;
        trip.ends_on = new_trip.ends_on;

        self.store.insert_trip(&trip).await?;
        tracing::info!(trip_id = %trip.id, created_by = %actor, "trip created");
        Ok(trip)
    }

    pub async fn trip(&self, trip_id: TripId, actor: &UserId) -> ResultEngine<Trip> {
        self.require_participant(trip_id, actor).await
    }

    pub async fn update_trip_details(
        &self,
        trip_id: TripId,
        patch: TripPatch,
        actor: &UserId,
    ) -> ResultEngine<Trip> {
        let mut trip = self.require_writable(trip_id, actor).await?;
        if let Some(name) = patch.name {
            trip.name = normalize_required_text(&name, "name")?;
        }
        if let Some(destination) = patch.destination {
            trip.destination = normalize_required_text(&destination, "destination")?;
        }
        if let Some(description) = patch.description {
            trip.description = normalize_optional_text(description.as_deref());
        }
        if let Some(starts_on) = patch.starts_on {
            trip.starts_on = starts_on;
        }
        if let Some(ends_on) = patch.ends_on {
            trip.ends_on = ends_on;
        }
        check_dates(trip.starts_on, trip.ends_on)?;

        self.store.update_trip_details(&trip).await?;
        tracing::debug!(%trip_id, "trip details updated");
        Ok(trip)
    }

    pub async fn trips_for(&self, user_id: &UserId) -> ResultEngine<TripList> {
        let (archived, active): (Vec<Trip>, Vec<Trip>) = self
            .store
            .trips_with_participant(user_id)
            .await?
            .into_iter()
            .partition(Trip::is_archived);
        Ok(TripList { active, archived })
    }

    /// First non-archived trip in discovery order. Archived trips are never
    /// picked implicitly.
    pub async fn current_trip(&self, user_id: &UserId) -> ResultEngine<Option<Trip>> {
        Ok(self
            .store
            .trips_with_participant(user_id)
            .await?
            .into_iter()
            .find(|trip| !trip.is_archived()))
    }

    /// Explicit selection, archived trips included (read-only).
    pub async fn select_trip(&self, trip_id: TripId, user_id: &UserId) -> ResultEngine<Trip> {
        self.require_participant(trip_id, user_id).await
    }

    /// Ends the trip. There is no way back.
    pub async fn archive_trip(&self, trip_id: TripId, actor: &UserId) -> ResultEngine<Trip> {
        let mut trip = self.require_participant(trip_id, actor).await?;
        ensure_writable(&trip)?;
        let ended_at = self.store.now();
        self.store
            .set_trip_status(trip_id, TripStatus::Archived, Some(ended_at))
            .await?;
        trip.status = TripStatus::Archived;
        trip.ended_at = Some(ended_at);
        tracing::info!(%trip_id, archived_by = %actor, "trip archived");
        Ok(trip)
    }

    /// Deletes the trip with its events, expenses and memberships. Only the
    /// creator may do this. A cascade interrupted by the store is re-run up
    /// to `cascade_attempts` times before the error is returned.
    pub async fn delete_trip(&self, trip_id: TripId, actor: &UserId) -> ResultEngine<()> {
        self.require_creator(trip_id, actor).await?;
        let attempts = self.settings.cascade_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.delete_trip_cascade(trip_id).await {
                Ok(true) => {
                    tracing::info!(%trip_id, deleted_by = %actor, "trip deleted");
                    return Ok(());
                }
                Ok(false) => return Err(EngineError::NotFound(format!("trip {trip_id}"))),
                Err(err) if err.is_transient() && attempt < attempts => {
                    tracing::warn!(%trip_id, attempt, "trip delete interrupted, retrying: {err}");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
