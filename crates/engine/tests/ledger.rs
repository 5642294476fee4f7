use std::{collections::BTreeSet, sync::Arc};

use chrono::NaiveDate;

use engine::{
    AuthIdentity, Category, Engine, EngineError, ErrorKind, ExpenseDraft, ExpensePatch, ExpenseStatus,
    MemoryStore, Money, NewTrip, Split, Standing, TripId, UserId, ValidationError,
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

/// Trip created by the first user, every other user added through an invite.
async fn trip_with(engine: &Engine, ids: &[&str]) -> (TripId, Vec<UserId>) {
    let mut users = Vec::new();
    for id in ids {
        users.push(sign_in(engine, id).await);
    }
    let trip = engine
        .create_trip(NewTrip::new("Lisbon", "Lisbon, Portugal"), &users[0])
        .await
        .unwrap();
    for user in &users[1..] {
        engine
            .invite(trip.id, &format!("{user}@example.com"), &users[0])
            .await
            .unwrap();
    }
    (trip.id, users)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()
}

#[tokio::test]
async fn two_expenses_offset_each_other() {
    let engine = memory_engine().await;
    let (trip_id, users) = trip_with(&engine, &["a", "b"]).await;
    let (a, b) = (&users[0], &users[1]);

    engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("dinner", Money::major(100), a.clone(), day()),
            a,
        )
        .await
        .unwrap();
    let report = engine.trip_balances(trip_id, a).await.unwrap();
    assert_eq!(report.balance_of(a), Some(Money::major(50)));
    assert_eq!(report.balance_of(b), Some(Money::major(-50)));

    engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("taxi", Money::major(50), b.clone(), day())
                .split_between([a.clone(), b.clone()]),
            b,
        )
        .await
        .unwrap();
    let report = engine.trip_balances(trip_id, b).await.unwrap();
    assert_eq!(report.balance_of(a), Some(Money::major(25)));
    assert_eq!(report.balance_of(b), Some(Money::major(-25)));
    assert_eq!(report.standing_of(a), Some(Standing::IsOwed));
    assert_eq!(report.standing_of(b), Some(Standing::Owes));
}

#[tokio::test]
async fn three_way_split_keeps_every_cent() {
    let engine = memory_engine().await;
    let (trip_id, users) = trip_with(&engine, &["a", "b", "c"]).await;

    engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("museum", Money::major(100), users[0].clone(), day()),
            &users[0],
        )
        .await
        .unwrap();

    let report = engine.trip_balances(trip_id, &users[0]).await.unwrap();
    assert_eq!(report.total_owed_by_people(), Money::major(100));
    for user in &users {
        let owed = report.people[user].owed;
        assert!((owed - Money::new(3333)).abs() <= Money::new(1));
    }
}

#[tokio::test]
async fn rejections_report_the_first_broken_rule() {
    let engine = memory_engine().await;
    let (trip_id, users) = trip_with(&engine, &["a", "b"]).await;
    let a = &users[0];
    let outsider = UserId::from("zed");

    let err = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("free", Money::ZERO, outsider.clone(), day()),
            a,
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation(ValidationError::InvalidAmount));

    let err = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("gift", Money::major(10), outsider.clone(), day()),
            a,
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation(ValidationError::PayerNotParticipant("zed".to_string()))
    );

    let err = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("nobody", Money::major(10), a.clone(), day())
                .split(Split::Between(BTreeSet::new())),
            a,
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation(ValidationError::EmptySplit));

    let err = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("drinks", Money::major(10), a.clone(), day())
                .split_between([a.clone(), outsider]),
            a,
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation(ValidationError::SplitNotParticipant("zed".to_string()))
    );

    assert!(engine.list_expenses(trip_id, a).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_with_same_fields_round_trips() {
    let engine = memory_engine().await;
    let (trip_id, users) = trip_with(&engine, &["a", "b"]).await;
    let a = &users[0];

    let id = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("hotel", Money::new(42_050), a.clone(), day())
                .category(Category::Lodging)
                .status(ExpenseStatus::Pending),
            a,
        )
        .await
        .unwrap();
    let original = engine.expense(id, a).await.unwrap();

    engine
        .update_expense(
            id,
            ExpensePatch::default()
                .amount(original.amount)
                .paid_by(original.paid_by.clone())
                .split_between(original.split_between.clone())
                .status(original.status)
                .description(original.description.clone())
                .category(original.category),
            a,
        )
        .await
        .unwrap();

    let listed = engine.list_expenses(trip_id, a).await.unwrap();
    assert_eq!(listed.len(), 1);
    let mut stored = listed[0].clone();
    assert!(stored.updated_at.is_some());
    stored.updated_at = None;
    assert_eq!(stored, original);
}

#[tokio::test]
async fn invalid_update_leaves_the_record_alone() {
    let engine = memory_engine().await;
    let (trip_id, users) = trip_with(&engine, &["a", "b"]).await;
    let a = &users[0];
    let id = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("bread", Money::major(3), a.clone(), day()),
            a,
        )
        .await
        .unwrap();

    let err = engine
        .update_expense(id, ExpensePatch::default().paid_by("zed"), a)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let stored = engine.expense(id, a).await.unwrap();
    assert_eq!(&stored.paid_by, a);
    assert!(stored.updated_at.is_none());
}

#[tokio::test]
async fn default_split_takes_every_participant() {
    let engine = memory_engine().await;
    let (trip_id, users) = trip_with(&engine, &["a", "b", "c"]).await;
    let a = &users[0];

    let shared = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("groceries", Money::major(30), a.clone(), day()),
            a,
        )
        .await
        .unwrap();
    let personal = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("souvenir", Money::major(8), a.clone(), day())
                .split(Split::PayerOnly),
            a,
        )
        .await
        .unwrap();

    let shared = engine.expense(shared, a).await.unwrap();
    assert_eq!(shared.split_between, users.iter().cloned().collect::<BTreeSet<_>>());
    let personal = engine.expense(personal, a).await.unwrap();
    assert_eq!(personal.split_between, BTreeSet::from([a.clone()]));
}

#[tokio::test]
async fn pending_expenses_only_show_in_totals() {
    let engine = memory_engine().await;
    let (trip_id, users) = trip_with(&engine, &["a", "b"]).await;
    let (a, b) = (&users[0], &users[1]);

    engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("tour", Money::major(80), b.clone(), day())
                .status(ExpenseStatus::Pending),
            b,
        )
        .await
        .unwrap();

    let report = engine.trip_balances(trip_id, a).await.unwrap();
    assert_eq!(report.total_pending, Money::major(80));
    assert_eq!(report.total_paid, Money::ZERO);
    assert_eq!(report.standing_of(a), Some(Standing::Settled));
    assert_eq!(report.standing_of(b), Some(Standing::Settled));
}

#[tokio::test]
async fn any_participant_may_remove_an_expense() {
    let engine = memory_engine().await;
    let (trip_id, users) = trip_with(&engine, &["a", "b"]).await;
    let (a, b) = (&users[0], &users[1]);
    let id = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("coffee", Money::major(4), a.clone(), day()),
            a,
        )
        .await
        .unwrap();

    let outsider = sign_in(&engine, "zed").await;
    assert!(matches!(
        engine.remove_expense(id, &outsider).await,
        Err(EngineError::PermissionDenied(_))
    ));

    engine.remove_expense(id, b).await.unwrap();
    assert!(engine.list_expenses(trip_id, a).await.unwrap().is_empty());
    assert!(matches!(
        engine.remove_expense(id, b).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn outsiders_cannot_read_or_write_the_ledger() {
    let engine = memory_engine().await;
    let (trip_id, users) = trip_with(&engine, &["a"]).await;
    let outsider = sign_in(&engine, "zed").await;

    let err = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("lunch", Money::major(12), users[0].clone(), day()),
            &outsider,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert!(engine.trip_balances(trip_id, &outsider).await.is_err());
}

#[tokio::test]
async fn amounts_above_the_limit_are_rejected() {
    let engine = memory_engine().await;
    let (trip_id, users) = trip_with(&engine, &["a", "b"]).await;
    let a = &users[0];

    let huge = Money::new(i64::MAX / 2 + 1);
    let err = engine
        .add_expense(
            trip_id,
            ExpenseDraft::new("yacht", huge, a.clone(), day()),
            a,
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation(ValidationError::AmountTooLarge(huge.to_string()))
    );

    for _ in 0..2 {
        engine
            .add_expense(
                trip_id,
                ExpenseDraft::new("villa", Money::MAX_EXPENSE, a.clone(), day()),
                a,
            )
            .await
            .unwrap();
    }
    let id = engine.list_expenses(trip_id, a).await.unwrap()[0].id;
    let err = engine
        .update_expense(id, ExpensePatch::default().amount(huge), a)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let report = engine.trip_balances(trip_id, a).await.unwrap();
    assert_eq!(report.total_paid, Money::new(2 * Money::MAX_EXPENSE.minor()));
    assert_eq!(report.balance_of(a), Some(Money::MAX_EXPENSE));

    let summary = engine.trip_summary(trip_id, a).await.unwrap();
    assert_eq!(summary.total_spent, report.total_paid);
}
