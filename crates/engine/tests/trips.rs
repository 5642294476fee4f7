use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use engine::{
    ActivityKind, AuthIdentity, Category, Countdown, Engine, EngineError, EngineSettings, Event, EventDraft,
    EventId, EventKind, Expense, ExpenseDraft, ExpenseId, MemoryStore, Money, NewTrip,
    ProfileRecord, Trip, TripId, TripPatch, TripStatus, UserId, ValidationError,
    store::{ChangeBus, Store},
};

type Result<T> = std::result::Result<T, EngineError>;

async fn memory_engine() -> Engine {
    Engine::builder()
        .store(Arc::new(MemoryStore::new()))
        .build()
        .await
        .unwrap()
}

async fn sign_in(engine: &Engine, id: &str) -> UserId {
    let user = UserId::from(id);
    engine
        .on_authenticated(AuthIdentity::new(user.clone(), format!("{id}@example.com")))
        .await
        .unwrap();
    user
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

/// Memory store whose trip delete fails with a transient error a fixed
/// number of times before going through.
struct FlakyStore {
    inner: MemoryStore,
    failures_left: AtomicU32,
    delete_calls: AtomicU32,
}

impl FlakyStore {
    fn failing(times: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures_left: AtomicU32::new(times),
            delete_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Store for FlakyStore {
    fn changes(&self) -> &ChangeBus {
        self.inner.changes()
    }

    async fn insert_trip(&self, trip: &Trip) -> Result<()> {
        self.inner.insert_trip(trip).await
    }

    async fn trip(&self, trip_id: TripId) -> Result<Option<Trip>> {
        self.inner.trip(trip_id).await
    }

    async fn update_trip_details(&self, trip: &Trip) -> Result<()> {
        self.inner.update_trip_details(trip).await
    }

    async fn set_trip_status(
        &self,
        trip_id: TripId,
        status: TripStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.inner.set_trip_status(trip_id, status, ended_at).await
    }

    async fn add_participant(&self, trip_id: TripId, user_id: &UserId) -> Result<bool> {
        self.inner.add_participant(trip_id, user_id).await
    }

    async fn remove_participant(&self, trip_id: TripId, user_id: &UserId) -> Result<bool> {
        self.inner.remove_participant(trip_id, user_id).await
    }

    async fn add_pending(&self, trip_id: TripId, email: &str, invited_by: &UserId) -> Result<bool> {
        self.inner.add_pending(trip_id, email, invited_by).await
    }

    async fn remove_pending(&self, trip_id: TripId, email: &str) -> Result<bool> {
        self.inner.remove_pending(trip_id, email).await
    }

    async fn promote_pending(&self, trip_id: TripId, email: &str, user_id: &UserId) -> Result<bool> {
        self.inner.promote_pending(trip_id, email, user_id).await
    }

    async fn trips_with_participant(&self, user_id: &UserId) -> Result<Vec<Trip>> {
        self.inner.trips_with_participant(user_id).await
    }

    async fn trips_with_pending(&self, email: &str) -> Result<Vec<Trip>> {
        self.inner.trips_with_pending(email).await
    }

    async fn delete_trip_cascade(&self, trip_id: TripId) -> Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(EngineError::StoreUnavailable("connection reset".to_string()));
        }
        self.inner.delete_trip_cascade(trip_id).await
    }

    async fn insert_expense(&self, expense: &Expense) -> Result<()> {
        self.inner.insert_expense(expense).await
    }

    async fn expense(&self, expense_id: ExpenseId) -> Result<Option<Expense>> {
        self.inner.expense(expense_id).await
    }

    async fn replace_expense(&self, expense: &Expense) -> Result<()> {
        self.inner.replace_expense(expense).await
    }

    async fn delete_expense(&self, expense_id: ExpenseId) -> Result<bool> {
        self.inner.delete_expense(expense_id).await
    }

    async fn expenses_by_trip(&self, trip_id: TripId) -> Result<Vec<Expense>> {
        self.inner.expenses_by_trip(trip_id).await
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        self.inner.insert_event(event).await
    }

    async fn event(&self, event_id: EventId) -> Result<Option<Event>> {
        self.inner.event(event_id).await
    }

    async fn replace_event(&self, event: &Event) -> Result<()> {
        self.inner.replace_event(event).await
    }

    async fn delete_event(&self, event_id: EventId) -> Result<bool> {
        self.inner.delete_event(event_id).await
    }

    async fn events_by_trip(&self, trip_id: TripId) -> Result<Vec<Event>> {
        self.inner.events_by_trip(trip_id).await
    }

    async fn profile(&self, user_id: &UserId) -> Result<Option<ProfileRecord>> {
        self.inner.profile(user_id).await
    }

    async fn insert_profile_if_absent(
        &self,
        user_id: &UserId,
        record: &ProfileRecord,
    ) -> Result<ProfileRecord> {
        self.inner.insert_profile_if_absent(user_id, record).await
    }

    async fn upsert_profile(&self, user_id: &UserId, record: &ProfileRecord) -> Result<()> {
        self.inner.upsert_profile(user_id, record).await
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<UserId>> {
        self.inner.find_profile_by_email(email).await
    }
}

#[tokio::test]
async fn new_trip_has_only_its_creator() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;

    let trip = engine
        .create_trip(
            NewTrip::new("  Alps ", "Chamonix")
                .description("ski week")
                .dates(date(1), date(8)),
            &owner,
        )
        .await
        .unwrap();
    assert_eq!(trip.name, "Alps");
    assert_eq!(trip.status, TripStatus::Active);
    assert_eq!(trip.participants.len(), 1);
    assert!(trip.is_creator(&owner));
    assert!(trip.pending_participants.is_empty());
    assert_eq!(engine.trip(trip.id, &owner).await.unwrap(), trip);
}

#[tokio::test]
async fn trip_fields_are_validated() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;

    assert_eq!(
        engine
            .create_trip(NewTrip::new(" ", "Chamonix"), &owner)
            .await,
        Err(EngineError::Validation(ValidationError::EmptyField("name")))
    );
    assert!(matches!(
        engine
            .create_trip(NewTrip::new("Alps", "Chamonix").dates(date(8), date(1)), &owner)
            .await,
        Err(EngineError::Validation(ValidationError::InvalidDates(_)))
    ));

    let trip = engine
        .create_trip(NewTrip::new("Alps", "Chamonix").dates(date(1), date(8)), &owner)
        .await
        .unwrap();
    let patch = TripPatch {
        ends_on: Some(Some(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap())),
        ..TripPatch::default()
    };
    assert!(matches!(
        engine.update_trip_details(trip.id, patch, &owner).await,
        Err(EngineError::Validation(ValidationError::InvalidDates(_)))
    ));

    let patch = TripPatch {
        destination: Some("Zermatt".to_string()),
        description: Some(None),
        ..TripPatch::default()
    };
    let updated = engine
        .update_trip_details(trip.id, patch, &owner)
        .await
        .unwrap();
    assert_eq!(updated.destination, "Zermatt");
    assert_eq!(updated.ends_on, Some(date(8)));
    assert_eq!(engine.trip(trip.id, &owner).await.unwrap(), updated);
}

#[tokio::test]
async fn current_trip_skips_archived_ones() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    assert_eq!(engine.current_trip(&owner).await.unwrap(), None);

    let old = engine
        .create_trip(NewTrip::new("Old", "Rome"), &owner)
        .await
        .unwrap();
    let new = engine
        .create_trip(NewTrip::new("New", "Oslo"), &owner)
        .await
        .unwrap();
    engine.archive_trip(old.id, &owner).await.unwrap();

    let current = engine.current_trip(&owner).await.unwrap().unwrap();
    assert_eq!(current.id, new.id);

    let list = engine.trips_for(&owner).await.unwrap();
    assert_eq!(list.active.len(), 1);
    assert_eq!(list.archived.len(), 1);
    assert_eq!(list.archived[0].id, old.id);
    assert!(list.archived[0].ended_at.is_some());

    let selected = engine.select_trip(old.id, &owner).await.unwrap();
    assert!(selected.is_archived());
}

#[tokio::test]
async fn archived_trip_is_read_only() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    let trip = engine
        .create_trip(NewTrip::new("Done", "Porto"), &owner)
        .await
        .unwrap();
    let expense = engine
        .add_expense(
            trip.id,
            ExpenseDraft::new("wine", Money::major(20), owner.clone(), date(2)),
            &owner,
        )
        .await
        .unwrap();
    engine.archive_trip(trip.id, &owner).await.unwrap();

    assert_eq!(
        engine
            .add_expense(
                trip.id,
                ExpenseDraft::new("more wine", Money::major(20), owner.clone(), date(3)),
                &owner,
            )
            .await,
        Err(EngineError::TripArchived)
    );
    assert_eq!(
        engine
            .add_event(
                trip.id,
                EventDraft::new(EventKind::Meal, "dinner", at(3, 20)),
                &owner
            )
            .await,
        Err(EngineError::TripArchived)
    );
    assert_eq!(
        engine.remove_expense(expense, &owner).await,
        Err(EngineError::TripArchived)
    );
    assert_eq!(
        engine.archive_trip(trip.id, &owner).await,
        Err(EngineError::TripArchived)
    );

    let report = engine.trip_balances(trip.id, &owner).await.unwrap();
    assert_eq!(report.total_paid, Money::major(20));
}

#[tokio::test]
async fn only_the_creator_deletes_and_everything_goes() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    let friend = sign_in(&engine, "friend").await;
    let trip = engine
        .create_trip(NewTrip::new("Gone", "Nice"), &owner)
        .await
        .unwrap();
    engine
        .invite(trip.id, "friend@example.com", &owner)
        .await
        .unwrap();
    let expense = engine
        .add_expense(
            trip.id,
            ExpenseDraft::new("beach chairs", Money::major(12), friend.clone(), date(4)),
            &friend,
        )
        .await
        .unwrap();
    let event = engine
        .add_event(
            trip.id,
            EventDraft::new(EventKind::Activity, "boat", at(4, 10)),
            &friend,
        )
        .await
        .unwrap();

    assert!(matches!(
        engine.delete_trip(trip.id, &friend).await,
        Err(EngineError::PermissionDenied(_))
    ));

    engine.delete_trip(trip.id, &owner).await.unwrap();
    assert!(matches!(
        engine.trip(trip.id, &owner).await,
        Err(EngineError::NotFound(_))
    ));
    assert_eq!(engine.store().expense(expense).await.unwrap(), None);
    assert_eq!(engine.store().event(event).await.unwrap(), None);
    assert!(engine.trips_for(&friend).await.unwrap().active.is_empty());
}

#[tokio::test]
async fn interrupted_delete_is_retried() {
    let store = Arc::new(FlakyStore::failing(2));
    let engine = Engine::builder()
        .store(store.clone())
        .build()
        .await
        .unwrap();
    let owner = sign_in(&engine, "owner").await;
    let trip = engine
        .create_trip(NewTrip::new("Retry", "Bern"), &owner)
        .await
        .unwrap();

    engine.delete_trip(trip.id, &owner).await.unwrap();
    assert_eq!(store.delete_calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.trip(trip.id).await.unwrap(), None);
}

#[tokio::test]
async fn delete_gives_up_after_the_configured_attempts() {
    let store = Arc::new(FlakyStore::failing(5));
    let engine = Engine::builder()
        .store(store.clone())
        .settings(EngineSettings {
            cascade_attempts: 2,
            ..EngineSettings::default()
        })
        .build()
        .await
        .unwrap();
    let owner = sign_in(&engine, "owner").await;
    let trip = engine
        .create_trip(NewTrip::new("Stuck", "Basel"), &owner)
        .await
        .unwrap();

    let err = engine.delete_trip(trip.id, &owner).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(store.delete_calls.load(Ordering::SeqCst), 2);
    assert!(engine.trip(trip.id, &owner).await.is_ok());
}

#[tokio::test]
async fn itinerary_is_sorted_and_grouped_by_day() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    let trip = engine
        .create_trip(NewTrip::new("Itinerary", "Vienna"), &owner)
        .await
        .unwrap();

    for (kind, title, when) in [
        (EventKind::Meal, "schnitzel", at(11, 19)),
        (EventKind::Flight, "arrival", at(10, 8)),
        (EventKind::Lodging, "check-in", at(10, 14)),
    ] {
        engine
            .add_event(trip.id, EventDraft::new(kind, title, when), &owner)
            .await
            .unwrap();
    }

    let titles: Vec<_> = engine
        .list_events(trip.id, &owner)
        .await
        .unwrap()
        .into_iter()
        .map(|event| event.title)
        .collect();
    assert_eq!(titles, ["arrival", "check-in", "schnitzel"]);

    let days = engine.events_by_day(trip.id, &owner).await.unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[&date(10)].len(), 2);
    assert_eq!(days[&date(11)][0].title, "schnitzel");

    assert!(matches!(
        engine
            .add_event(trip.id, EventDraft::new(EventKind::Meal, "  ", at(12, 12)), &owner)
            .await,
        Err(EngineError::Validation(ValidationError::EmptyField(_)))
    ));
}

#[tokio::test]
async fn summary_and_feed_follow_the_ledger() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    let trip = engine
        .create_trip(NewTrip::new("Report", "Madrid"), &owner)
        .await
        .unwrap();
    engine
        .add_event(
            trip.id,
            EventDraft::new(EventKind::Meal, "tapas", at(5, 21)),
            &owner,
        )
        .await
        .unwrap();
    engine
        .add_expense(
            trip.id,
            ExpenseDraft::new("tapas", Money::major(36), owner.clone(), date(5))
                .category(Category::Food),
            &owner,
        )
        .await
        .unwrap();

    let summary = engine.trip_summary(trip.id, &owner).await.unwrap();
    assert_eq!(summary.participant_count, 1);
    assert_eq!(summary.event_count, 1);
    assert_eq!(summary.expense_count, 1);
    assert_eq!(summary.total_spent, Money::major(36));
    assert_eq!(summary.top_category, Some((Category::Food, Money::major(36))));
    assert_eq!(summary.most_common_event, Some((EventKind::Meal, 1)));

    let feed = engine.recent_activity(trip.id, 10, &owner).await.unwrap();
    assert_eq!(feed.len(), 2);
    assert!(feed.iter().all(|item| item.actor == owner));
    assert!(
        feed.iter()
            .any(|item| matches!(item.kind, ActivityKind::Expense { .. }))
    );
    assert_eq!(engine.recent_activity(trip.id, 1, &owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn countdown_follows_the_trip_dates() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    let outsider = sign_in(&engine, "outsider").await;
    let undated = engine
        .create_trip(NewTrip::new("Someday", "Lima"), &owner)
        .await
        .unwrap();
    assert_eq!(
        engine.trip_countdown(undated.id, &owner).await.unwrap(),
        Countdown::Unscheduled
    );

    let past = engine
        .create_trip(
            NewTrip::new("Back then", "Quito").dates(date(1), date(3)),
            &owner,
        )
        .await
        .unwrap();
    assert!(matches!(
        engine.trip_countdown(past.id, &owner).await.unwrap(),
        Countdown::Ended { .. }
    ));
    assert!(matches!(
        engine.trip_countdown(past.id, &outsider).await,
        Err(EngineError::PermissionDenied(_))
    ));
}
