use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
    EngineError, Event, EventDraft, EventId, EventPatch, ResultEngine, TripId, UserId,
    util::{normalize_optional_text, normalize_required_text},
};

use super::Engine;

impl Engine {
    async fn load_event(&self, event_id: EventId) -> ResultEngine<Event> {
        self.store
            .event(event_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("event {event_id}")))
    }

    pub async fn add_event(
        &self,
        trip_id: TripId,
        draft: EventDraft,
        actor: &UserId,
    ) -> ResultEngine<EventId> {
        self.require_writable(trip_id, actor).await?;
        let event = Event {
            id: EventId::new(),
            trip_id,
            kind: draft.kind,
            title: normalize_required_text(&draft.title, "title")?,
            occurs_at: draft.occurs_at,
            location: normalize_optional_text(draft.location.as_deref()),
            description: normalize_optional_text(draft.description.as_deref()),
            created_by: actor.clone(),
            created_at: self.store.now(),
            updated_at: None,
        };
        self.store.insert_event(&event).await?;
        tracing::debug!(%trip_id, event_id = %event.id, kind = event.kind.as_str(), "event added");
        Ok(event.id)
    }

    pub async fn update_event(
        &self,
        event_id: EventId,
        patch: EventPatch,
        actor: &UserId,
    ) -> ResultEngine<Event> {
        let mut event = self.load_event(event_id).await?;
        self.require_writable(event.trip_id, actor).await?;

        if let Some(kind) = patch.kind {
            event.kind = kind;
        }
        if let Some(title) = patch.title {
            event.title = normalize_required_text(&title, "title")?;
        }
        if let Some(occurs_at) = patch.occurs_at {
            event.occurs_at = occurs_at;
        }
        if let Some(location) = patch.location {
            event.location = normalize_optional_text(location.as_deref());
        }
        if let Some(description) = patch.description {
            event.description = normalize_optional_text(description.as_deref());
        }
        event.updated_at = Some(self.store.now());

        self.store.replace_event(&event).await?;
        tracing::debug!(trip_id = %event.trip_id, %event_id, "event updated");
        Ok(event)
    }

    pub async fn remove_event(&self, event_id: EventId, actor: &UserId) -> ResultEngine<()> {
        let event = self.load_event(event_id).await?;
        self.require_writable(event.trip_id, actor).await?;
        if !self.store.delete_event(event_id).await? {
            return Err(EngineError::NotFound(format!("event {event_id}")));
        }
        tracing::debug!(trip_id = %event.trip_id, %event_id, "event removed");
        Ok(())
    }

    /// Itinerary of the trip, earliest first.
    pub async fn list_events(&self, trip_id: TripId, actor: &UserId) -> ResultEngine<Vec<Event>> {
        self.require_participant(trip_id, actor).await?;
        let mut events = self.store.events_by_trip(trip_id).await?;
        events.sort_by(|a, b| {
            a.occurs_at
                .cmp(&b.occurs_at)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(events)
    }

    /// Itinerary grouped by calendar day (UTC), each day earliest first.
    pub async fn events_by_day(
        &self,
        trip_id: TripId,
        actor: &UserId,
    ) -> ResultEngine<BTreeMap<NaiveDate, Vec<Event>>> {
        let mut days: BTreeMap<NaiveDate, Vec<Event>> = BTreeMap::new();
        for event in self.list_events(trip_id, actor).await? {
            days.entry(event.occurs_at.date_naive())
                .or_default()
                .push(event);
        }
        Ok(days)
    }
}
