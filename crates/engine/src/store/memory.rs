//! In-process store for tests and demos.
//!
//! A single `RwLock` guards every table, so each call is atomic with respect
//! to the others. Nothing survives the process.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    EngineError, Event, EventId, Expense, ExpenseId, ProfileRecord, ResultEngine, Trip, TripId,
    TripStatus, UserId,
};

use super::{ChangeBus, ChangeEvent, ChangeKind, ChangedEntity, Store, notify, sort_by_discovery};

#[derive(Debug, Default)]
struct Tables {
    trips: HashMap<TripId, Trip>,
    expenses: HashMap<ExpenseId, Expense>,
    events: HashMap<EventId, Event>,
    profiles: HashMap<UserId, ProfileRecord>,
}

impl Tables {
    fn trip_mut(&mut self, trip_id: TripId) -> ResultEngine<&mut Trip> {
        self.trips
            .get_mut(&trip_id)
            .ok_or_else(|| EngineError::NotFound(format!("trip {trip_id}")))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    changes: ChangeBus,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn publish(&self, trip_id: TripId, entity: ChangedEntity, kind: ChangeKind) {
        notify(&self.changes, trip_id, entity, kind, self.now());
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn changes(&self) -> &ChangeBus {
        &self.changes
    }

    async fn insert_trip(&self, trip: &Trip) -> ResultEngine<()> {
        let mut tables = self.tables.write().await;
        if tables.trips.contains_key(&trip.id) {
            return Err(EngineError::AlreadyExists(format!("trip {}", trip.id)));
        }
        tables.trips.insert(trip.id, trip.clone());
        drop(tables);
        self.publish(trip.id, ChangedEntity::Trip, ChangeKind::Created);
        Ok(())
    }

    async fn trip(&self, trip_id: TripId) -> ResultEngine<Option<Trip>> {
        Ok(self.tables.read().await.trips.get(&trip_id).cloned())
    }

    async fn update_trip_details(&self, trip: &Trip) -> ResultEngine<()> {
        let mut tables = self.tables.write().await;
        let stored = tables.trip_mut(trip.id)?;
        stored.name.clone_from(&trip.name);
        stored.destination.clone_from(&trip.destination);
        stored.description.clone_from(&trip.description);
        stored.starts_on = trip.starts_on;
        stored.ends_on = trip.ends_on;
        drop(tables);
        self.publish(trip.id, ChangedEntity::Trip, ChangeKind::Updated);
        Ok(())
    }

    async fn set_trip_status(
        &self,
        trip_id: TripId,
        status: TripStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<()> {
        let mut tables = self.tables.write().await;
        let stored = tables.trip_mut(trip_id)?;
        stored.status = status;
        stored.ended_at = ended_at;
        drop(tables);
        self.publish(trip_id, ChangedEntity::Trip, ChangeKind::Updated);
        Ok(())
    }

    async fn add_participant(&self, trip_id: TripId, user_id: &UserId) -> ResultEngine<bool> {
        let added = self
            .tables
            .write()
            .await
            .trip_mut(trip_id)?
            .participants
            .insert(user_id.clone());
        if added {
            self.publish(trip_id, ChangedEntity::Membership, ChangeKind::Created);
        }
        Ok(added)
    }

    async fn remove_participant(&self, trip_id: TripId, user_id: &UserId) -> ResultEngine<bool> {
        let removed = self
            .tables
            .write()
            .await
            .trip_mut(trip_id)?
            .participants
            .remove(user_id);
        if removed {
            self.publish(trip_id, ChangedEntity::Membership, ChangeKind::Deleted);
        }
        Ok(removed)
    }

    async fn add_pending(
        &self,
        trip_id: TripId,
        email: &str,
        _invited_by: &UserId,
    ) -> ResultEngine<bool> {
        let added = self
            .tables
            .write()
            .await
            .trip_mut(trip_id)?
            .pending_participants
            .insert(email.to_string());
        if added {
            self.publish(trip_id, ChangedEntity::Membership, ChangeKind::Created);
        }
        Ok(added)
    }

    async fn remove_pending(&self, trip_id: TripId, email: &str) -> ResultEngine<bool> {
        let removed = self
            .tables
            .write()
            .await
            .trip_mut(trip_id)?
            .pending_participants
            .remove(email);
        if removed {
            self.publish(trip_id, ChangedEntity::Membership, ChangeKind::Deleted);
        }
        Ok(removed)
    }

    async fn promote_pending(
        &self,
        trip_id: TripId,
        email: &str,
        user_id: &UserId,
    ) -> ResultEngine<bool> {
        let mut tables = self.tables.write().await;
        let trip = tables.trip_mut(trip_id)?;
        if !trip.pending_participants.remove(email) {
            return Ok(false);
        }
        trip.participants.insert(user_id.clone());
        drop(tables);
        self.publish(trip_id, ChangedEntity::Membership, ChangeKind::Updated);
        Ok(true)
    }

    async fn trips_with_participant(&self, user_id: &UserId) -> ResultEngine<Vec<Trip>> {
        let mut trips: Vec<Trip> = self
            .tables
            .read()
            .await
            .trips
            .values()
            .filter(|t| t.is_participant(user_id))
            .cloned()
            .collect();
        sort_by_discovery(&mut trips);
        Ok(trips)
    }

    async fn trips_with_pending(&self, email: &str) -> ResultEngine<Vec<Trip>> {
        let mut trips: Vec<Trip> = self
            .tables
            .read()
            .await
            .trips
            .values()
            .filter(|t| t.is_pending(email))
            .cloned()
            .collect();
        sort_by_discovery(&mut trips);
        Ok(trips)
    }

    async fn delete_trip_cascade(&self, trip_id: TripId) -> ResultEngine<bool> {
        let mut tables = self.tables.write().await;
        if !tables.trips.contains_key(&trip_id) {
            return Ok(false);
        }
        tables.events.retain(|_, e| e.trip_id != trip_id);
        tables.expenses.retain(|_, e| e.trip_id != trip_id);
        tables.trips.remove(&trip_id);
        drop(tables);
        self.changes.close(ChangeEvent {
            trip_id,
            entity: ChangedEntity::Trip,
            kind: ChangeKind::Deleted,
            at: self.now(),
        });
        Ok(true)
    }

    async fn insert_expense(&self, expense: &Expense) -> ResultEngine<()> {
        let mut tables = self.tables.write().await;
        if tables.expenses.contains_key(&expense.id) {
            return Err(EngineError::AlreadyExists(format!("expense {}", expense.id)));
        }
        tables.expenses.insert(expense.id, expense.clone());
        drop(tables);
        self.publish(expense.trip_id, ChangedEntity::Expense, ChangeKind::Created);
        Ok(())
    }

    async fn expense(&self, expense_id: ExpenseId) -> ResultEngine<Option<Expense>> {
        Ok(self.tables.read().await.expenses.get(&expense_id).cloned())
    }

    async fn replace_expense(&self, expense: &Expense) -> ResultEngine<()> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.expenses.get_mut(&expense.id) else {
            return Err(EngineError::NotFound(format!("expense {}", expense.id)));
        };
        *stored = expense.clone();
        drop(tables);
        self.publish(expense.trip_id, ChangedEntity::Expense, ChangeKind::Updated);
        Ok(())
    }

    async fn delete_expense(&self, expense_id: ExpenseId) -> ResultEngine<bool> {
        let removed = self.tables.write().await.expenses.remove(&expense_id);
        let Some(expense) = removed else {
            return Ok(false);
        };
        self.publish(expense.trip_id, ChangedEntity::Expense, ChangeKind::Deleted);
        Ok(true)
    }

    async fn expenses_by_trip(&self, trip_id: TripId) -> ResultEngine<Vec<Expense>> {
        Ok(self
            .tables
            .read()
            .await
            .expenses
            .values()
            .filter(|e| e.trip_id == trip_id)
            .cloned()
            .collect())
    }

    async fn insert_event(&self, event: &Event) -> ResultEngine<()> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.id) {
            return Err(EngineError::AlreadyExists(format!("event {}", event.id)));
        }
        tables.events.insert(event.id, event.clone());
        drop(tables);
        self.publish(event.trip_id, ChangedEntity::Event, ChangeKind::Created);
        Ok(())
    }

    async fn event(&self, event_id: EventId) -> ResultEngine<Option<Event>> {
        Ok(self.tables.read().await.events.get(&event_id).cloned())
    }

    async fn replace_event(&self, event: &Event) -> ResultEngine<()> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.events.get_mut(&event.id) else {
            return Err(EngineError::NotFound(format!("event {}", event.id)));
        };
        *stored = event.clone();
        drop(tables);
        self.publish(event.trip_id, ChangedEntity::Event, ChangeKind::Updated);
        Ok(())
    }

    async fn delete_event(&self, event_id: EventId) -> ResultEngine<bool> {
        let removed = self.tables.write().await.events.remove(&event_id);
        let Some(event) = removed else {
            return Ok(false);
        };
        self.publish(event.trip_id, ChangedEntity::Event, ChangeKind::Deleted);
        Ok(true)
    }

    async fn events_by_trip(&self, trip_id: TripId) -> ResultEngine<Vec<Event>> {
        Ok(self
            .tables
            .read()
            .await
            .events
            .values()
            .filter(|e| e.trip_id == trip_id)
            .cloned()
            .collect())
    }

    async fn profile(&self, user_id: &UserId) -> ResultEngine<Option<ProfileRecord>> {
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn insert_profile_if_absent(
        &self,
        user_id: &UserId,
        record: &ProfileRecord,
    ) -> ResultEngine<ProfileRecord> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .profiles
            .entry(user_id.clone())
            .or_insert_with(|| record.clone())
            .clone())
    }

    async fn upsert_profile(&self, user_id: &UserId, record: &ProfileRecord) -> ResultEngine<()> {
        self.tables
            .write()
            .await
            .profiles
            .insert(user_id.clone(), record.clone());
        Ok(())
    }

    async fn find_profile_by_email(&self, email: &str) -> ResultEngine<Option<UserId>> {
        let tables = self.tables.read().await;
        let mut matches: Vec<&UserId> = tables
            .profiles
            .iter()
            .filter(|(_, p)| !p.placeholder && p.email == email)
            .map(|(id, _)| id)
            .collect();
        matches.sort();
        Ok(matches.first().map(|id| (*id).clone()))
    }
}
