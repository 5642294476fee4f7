//! Document store behind the engine.
//!
//! The engine never talks to a backend directly: every read and write goes
//! through [`Store`], selected by configuration at startup. Two
//! implementations ship with the crate:
//!
//! - [`MemoryStore`] keeps everything in process memory (tests, demos).
//! - [`SqliteStore`] persists through sea-orm on SQLite.
//!
//! Membership sets are only ever changed with set-add / set-remove calls so
//! two clients editing the same trip cannot lose each other's updates. Every
//! write publishes a [`ChangeEvent`] on the store's [`ChangeBus`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Event, EventId, Expense, ExpenseId, ProfileRecord, ResultEngine, Trip, TripId, TripStatus,
    UserId,
};

pub use changes::{ChangeBus, ChangeEvent, ChangeKind, ChangeStream, ChangedEntity};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

mod changes;
mod memory;
mod sqlite;

#[async_trait]
pub trait Store: Send + Sync {
    /// Write timestamp assigned by the store, never by the client.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn changes(&self) -> &ChangeBus;

    /// Live notifications for one trip.
    fn subscribe(&self, trip_id: TripId) -> ChangeStream {
        self.changes().subscribe(trip_id)
    }

    // Trips

    async fn insert_trip(&self, trip: &Trip) -> ResultEngine<()>;

    async fn trip(&self, trip_id: TripId) -> ResultEngine<Option<Trip>>;

    /// Writes the descriptive fields (name, destination, description, dates)
    /// and leaves membership and status untouched.
    async fn update_trip_details(&self, trip: &Trip) -> ResultEngine<()>;

    async fn set_trip_status(
        &self,
        trip_id: TripId,
        status: TripStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<()>;

    /// Set-add on `participants`. Returns `false` when already present.
    async fn add_participant(&self, trip_id: TripId, user_id: &UserId) -> ResultEngine<bool>;

    /// Set-remove on `participants`. Returns `false` when absent.
    async fn remove_participant(&self, trip_id: TripId, user_id: &UserId) -> ResultEngine<bool>;

    /// Set-add on `pending_participants`. Returns `false` when already pending.
    async fn add_pending(
        &self,
        trip_id: TripId,
        email: &str,
        invited_by: &UserId,
    ) -> ResultEngine<bool>;

    /// Set-remove on `pending_participants`. Returns `false` when absent.
    async fn remove_pending(&self, trip_id: TripId, email: &str) -> ResultEngine<bool>;

    /// Atomically drops `email` from the pending set and adds `user_id` to
    /// the participants. Returns `false` (and writes nothing) when the email
    /// is no longer pending.
    async fn promote_pending(
        &self,
        trip_id: TripId,
        email: &str,
        user_id: &UserId,
    ) -> ResultEngine<bool>;

    /// Trips listing `user_id` as participant, oldest first.
    async fn trips_with_participant(&self, user_id: &UserId) -> ResultEngine<Vec<Trip>>;

    /// Trips holding a pending invite for `email`, oldest first.
    async fn trips_with_pending(&self, email: &str) -> ResultEngine<Vec<Trip>>;

    /// Deletes events, expenses and membership rows, then the trip itself,
    /// all or nothing. Returns `false` when the trip did not exist.
    async fn delete_trip_cascade(&self, trip_id: TripId) -> ResultEngine<bool>;

    // Ledger

    async fn insert_expense(&self, expense: &Expense) -> ResultEngine<()>;

    async fn expense(&self, expense_id: ExpenseId) -> ResultEngine<Option<Expense>>;

    /// Overwrites the whole record, split set included.
    async fn replace_expense(&self, expense: &Expense) -> ResultEngine<()>;

    async fn delete_expense(&self, expense_id: ExpenseId) -> ResultEngine<bool>;

    async fn expenses_by_trip(&self, trip_id: TripId) -> ResultEngine<Vec<Expense>>;

    // Itinerary

    async fn insert_event(&self, event: &Event) -> ResultEngine<()>;

    async fn event(&self, event_id: EventId) -> ResultEngine<Option<Event>>;

    async fn replace_event(&self, event: &Event) -> ResultEngine<()>;

    async fn delete_event(&self, event_id: EventId) -> ResultEngine<bool>;

    async fn events_by_trip(&self, trip_id: TripId) -> ResultEngine<Vec<Event>>;

    // Directory

    async fn profile(&self, user_id: &UserId) -> ResultEngine<Option<ProfileRecord>>;

    /// Write-if-absent. Returns whichever record is stored afterwards, so a
    /// concurrent real profile is never overwritten by a placeholder.
    async fn insert_profile_if_absent(
        &self,
        user_id: &UserId,
        record: &ProfileRecord,
    ) -> ResultEngine<ProfileRecord>;

    async fn upsert_profile(&self, user_id: &UserId, record: &ProfileRecord) -> ResultEngine<()>;

    /// Exact match on an already normalized email. Placeholders never match.
    async fn find_profile_by_email(&self, email: &str) -> ResultEngine<Option<UserId>>;
}

pub(crate) fn notify(
    bus: &ChangeBus,
    trip_id: TripId,
    entity: ChangedEntity,
    kind: ChangeKind,
    at: DateTime<Utc>,
) {
    bus.publish(ChangeEvent {
        trip_id,
        entity,
        kind,
        at,
    });
}

/// Oldest first, ties broken by id so the order is stable across stores.
pub(crate) fn sort_by_discovery(trips: &mut [Trip]) {
    trips.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
