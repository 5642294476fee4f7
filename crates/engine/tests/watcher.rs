use std::{sync::Arc, time::Duration};

use chrono::{NaiveDate, Utc};
use tokio::time::timeout;

use engine::{
    AuthIdentity, BalanceWatcher, Engine, EventDraft, EventKind, ExpenseDraft, MemoryStore, Money,
    NewTrip, UserId,
};

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

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
}

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn watcher_follows_the_ledger() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    let friend = sign_in(&engine, "friend").await;
    let trip = engine
        .create_trip(NewTrip::new("Live", "Athens"), &owner)
        .await
        .unwrap();

    let mut watcher = BalanceWatcher::spawn(engine.clone(), trip.id, &owner)
        .await
        .unwrap();
    assert_eq!(watcher.trip_id(), trip.id);
    assert_eq!(watcher.current().total_paid, Money::ZERO);
    assert_eq!(watcher.current().people.len(), 1);

    engine
        .invite(trip.id, "friend@example.com", &owner)
        .await
        .unwrap();
    let report = timeout(WAIT, watcher.changed()).await.unwrap().unwrap();
    assert_eq!(report.people.len(), 2);

    engine
        .add_expense(
            trip.id,
            ExpenseDraft::new("ferry", Money::major(60), friend.clone(), day()),
            &friend,
        )
        .await
        .unwrap();
    let report = timeout(WAIT, watcher.changed()).await.unwrap().unwrap();
    assert_eq!(report.total_paid, Money::major(60));
    assert_eq!(report.balance_of(&friend), Some(Money::major(30)));
    assert_eq!(watcher.current(), report);
    assert_eq!(*watcher.subscribe().borrow(), report);
}

#[tokio::test]
async fn itinerary_changes_do_not_trigger_a_recompute() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    let trip = engine
        .create_trip(NewTrip::new("Quiet", "Sofia"), &owner)
        .await
        .unwrap();
    let mut watcher = BalanceWatcher::spawn(engine.clone(), trip.id, &owner)
        .await
        .unwrap();

    engine
        .add_event(
            trip.id,
            EventDraft::new(EventKind::Activity, "old town walk", Utc::now()),
            &owner,
        )
        .await
        .unwrap();
    engine
        .add_expense(
            trip.id,
            ExpenseDraft::new("tea", Money::major(2), owner.clone(), day()),
            &owner,
        )
        .await
        .unwrap();

    let report = timeout(WAIT, watcher.changed()).await.unwrap().unwrap();
    assert_eq!(report.total_paid, Money::major(2));
}

#[tokio::test]
async fn watcher_stops_when_the_trip_is_deleted() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    let trip = engine
        .create_trip(NewTrip::new("Short", "Split"), &owner)
        .await
        .unwrap();
    let mut watcher = BalanceWatcher::spawn(engine.clone(), trip.id, &owner)
        .await
        .unwrap();

    engine.delete_trip(trip.id, &owner).await.unwrap();
    let stopped = timeout(WAIT, watcher.changed()).await.unwrap();
    assert!(stopped.is_err());
    timeout(WAIT, async {
        while !watcher.is_finished() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(engine.store().changes().subscriber_count(trip.id), 0);
}

#[tokio::test]
async fn outsiders_cannot_watch() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    let outsider = sign_in(&engine, "outsider").await;
    let trip = engine
        .create_trip(NewTrip::new("Private", "Bled"), &owner)
        .await
        .unwrap();

    assert!(
        BalanceWatcher::spawn(engine.clone(), trip.id, &outsider)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn removed_participant_stops_receiving_reports() {
    let engine = memory_engine().await;
    let owner = sign_in(&engine, "owner").await;
    let friend = sign_in(&engine, "friend").await;
    let trip = engine
        .create_trip(NewTrip::new("Shared", "Lyon"), &owner)
        .await
        .unwrap();
    engine
        .invite(trip.id, "friend@example.com", &owner)
        .await
        .unwrap();
    let mut watcher = BalanceWatcher::spawn(engine.clone(), trip.id, &friend)
        .await
        .unwrap();

    engine
        .remove_participant(trip.id, &friend, &owner)
        .await
        .unwrap();
    assert!(engine.trip_balances(trip.id, &friend).await.is_err());

    engine
        .add_expense(
            trip.id,
            ExpenseDraft::new("private dinner", Money::major(999), owner.clone(), day()),
            &owner,
        )
        .await
        .unwrap();

    let stopped = timeout(WAIT, watcher.changed()).await.unwrap();
    assert!(stopped.is_err());
    assert_eq!(watcher.current().total_paid, Money::ZERO);
}
