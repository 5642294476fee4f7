//! Live store over a sea-orm connection (SQLite).
//!
//! Trips, expenses and events map to one row each; membership sets and split
//! sets live in composite-key tables so adding a member is an insert that
//! ignores conflicts and removing one is a targeted delete.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseConnection, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::OnConflict,
};

use crate::{
    EngineError, Event, EventId, Expense, ExpenseId, ProfileRecord, ResultEngine, Trip, TripId,
    TripStatus, UserId, event, expense, expense_splits, profile, trip, trip_participants,
    trip_pending_invites,
};

use super::{ChangeBus, ChangeEvent, ChangeKind, ChangedEntity, Store, notify};

/// Run a block inside a DB transaction, committing on success. An early
/// return drops the transaction, which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.db.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: DatabaseConnection,
    changes: ChangeBus,
}

impl SqliteStore {
    /// Wrap an already migrated connection.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            changes: ChangeBus::new(),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn publish(&self, trip_id: TripId, entity: ChangedEntity, kind: ChangeKind) {
        notify(&self.changes, trip_id, entity, kind, self.now());
    }
}

async fn load_trip<C: ConnectionTrait>(db: &C, model: trip::Model) -> ResultEngine<Trip> {
    let participants: BTreeSet<UserId> = trip_participants::Entity::find()
        .filter(trip_participants::Column::TripId.eq(model.id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| UserId::new(row.user_id))
        .collect();
    let pending: BTreeSet<String> = trip_pending_invites::Entity::find()
        .filter(trip_pending_invites::Column::TripId.eq(model.id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.email)
        .collect();
    Trip::from_parts(model, participants, pending)
}

async fn load_trips<C: ConnectionTrait>(db: &C, ids: Vec<Uuid>) -> ResultEngine<Vec<Trip>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let models = trip::Entity::find()
        .filter(trip::Column::Id.is_in(ids))
        .order_by_asc(trip::Column::CreatedAt)
        .order_by_asc(trip::Column::Id)
        .all(db)
        .await?;
    let mut out = Vec::with_capacity(models.len());
    for model in models {
        out.push(load_trip(db, model).await?);
    }
    Ok(out)
}

async fn insert_participant<C: ConnectionTrait>(
    db: &C,
    trip_id: TripId,
    user_id: &UserId,
    added_at: DateTime<Utc>,
) -> ResultEngine<bool> {
    let inserted = trip_participants::Entity::insert(trip_participants::ActiveModel {
        trip_id: ActiveValue::Set(trip_id.0),
        user_id: ActiveValue::Set(user_id.to_string()),
        added_at: ActiveValue::Set(added_at),
    })
    .on_conflict(
        OnConflict::columns([
            trip_participants::Column::TripId,
            trip_participants::Column::UserId,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(db)
    .await?;
    Ok(inserted > 0)
}

async fn insert_splits<C: ConnectionTrait>(db: &C, expense: &Expense) -> ResultEngine<()> {
    for user_id in &expense.split_between {
        expense_splits::ActiveModel {
            expense_id: ActiveValue::Set(expense.id.0),
            user_id: ActiveValue::Set(user_id.to_string()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn splits_of<C: ConnectionTrait>(
    db: &C,
    expense_ids: Vec<Uuid>,
) -> ResultEngine<BTreeMap<Uuid, BTreeSet<UserId>>> {
    let mut out: BTreeMap<Uuid, BTreeSet<UserId>> = BTreeMap::new();
    if expense_ids.is_empty() {
        return Ok(out);
    }
    let rows = expense_splits::Entity::find()
        .filter(expense_splits::Column::ExpenseId.is_in(expense_ids))
        .all(db)
        .await?;
    for row in rows {
        out.entry(row.expense_id)
            .or_default()
            .insert(UserId::new(row.user_id));
    }
    Ok(out)
}

#[async_trait]
impl Store for SqliteStore {
    fn changes(&self) -> &ChangeBus {
        &self.changes
    }

    async fn insert_trip(&self, trip: &Trip) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            trip::ActiveModel::from(trip).insert(&db_tx).await?;
            for user_id in &trip.participants {
                insert_participant(&db_tx, trip.id, user_id, trip.created_at).await?;
            }
            for email in &trip.pending_participants {
                trip_pending_invites::ActiveModel {
                    trip_id: ActiveValue::Set(trip.id.0),
                    email: ActiveValue::Set(email.clone()),
                    invited_by: ActiveValue::Set(trip.created_by.to_string()),
                    invited_at: ActiveValue::Set(trip.created_at),
                }
                .insert(&db_tx)
                .await?;
            }
            Ok::<_, EngineError>(())
        })?;
        self.publish(trip.id, ChangedEntity::Trip, ChangeKind::Created);
        Ok(())
    }

    async fn trip(&self, trip_id: TripId) -> ResultEngine<Option<Trip>> {
        let Some(model) = trip::Entity::find_by_id(trip_id.0).one(&self.db).await? else {
            return Ok(None);
        };
        load_trip(&self.db, model).await.map(Some)
    }

    async fn update_trip_details(&self, trip: &Trip) -> ResultEngine<()> {
        let result = trip::Entity::update_many()
            .set(trip::ActiveModel {
                name: ActiveValue::Set(trip.name.clone()),
                destination: ActiveValue::Set(trip.destination.clone()),
                description: ActiveValue::Set(trip.description.clone()),
                starts_on: ActiveValue::Set(trip.starts_on),
                ends_on: ActiveValue::Set(trip.ends_on),
                ..Default::default()
            })
            .filter(trip::Column::Id.eq(trip.id.0))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::NotFound(format!("trip {}", trip.id)));
        }
        self.publish(trip.id, ChangedEntity::Trip, ChangeKind::Updated);
        Ok(())
    }

    async fn set_trip_status(
        &self,
        trip_id: TripId,
        status: TripStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<()> {
        let result = trip::Entity::update_many()
            .set(trip::ActiveModel {
                status: ActiveValue::Set(status.as_str().to_string()),
                ended_at: ActiveValue::Set(ended_at),
                ..Default::default()
            })
            .filter(trip::Column::Id.eq(trip_id.0))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::NotFound(format!("trip {trip_id}")));
        }
        self.publish(trip_id, ChangedEntity::Trip, ChangeKind::Updated);
        Ok(())
    }

    async fn add_participant(&self, trip_id: TripId, user_id: &UserId) -> ResultEngine<bool> {
        let added = insert_participant(&self.db, trip_id, user_id, self.now()).await?;
        if added {
            self.publish(trip_id, ChangedEntity::Membership, ChangeKind::Created);
        }
        Ok(added)
    }

    async fn remove_participant(&self, trip_id: TripId, user_id: &UserId) -> ResultEngine<bool> {
        let result = trip_participants::Entity::delete_many()
            .filter(trip_participants::Column::TripId.eq(trip_id.0))
            .filter(trip_participants::Column::UserId.eq(user_id.as_str()))
            .exec(&self.db)
            .await?;
        let removed = result.rows_affected > 0;
        if removed {
            self.publish(trip_id, ChangedEntity::Membership, ChangeKind::Deleted);
        }
        Ok(removed)
    }

    async fn add_pending(
        &self,
        trip_id: TripId,
        email: &str,
        invited_by: &UserId,
    ) -> ResultEngine<bool> {
        let inserted = trip_pending_invites::Entity::insert(trip_pending_invites::ActiveModel {
            trip_id: ActiveValue::Set(trip_id.0),
            email: ActiveValue::Set(email.to_string()),
            invited_by: ActiveValue::Set(invited_by.to_string()),
            invited_at: ActiveValue::Set(self.now()),
        })
        .on_conflict(
            OnConflict::columns([
                trip_pending_invites::Column::TripId,
                trip_pending_invites::Column::Email,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;
        let added = inserted > 0;
        if added {
            self.publish(trip_id, ChangedEntity::Membership, ChangeKind::Created);
        }
        Ok(added)
    }

    async fn remove_pending(&self, trip_id: TripId, email: &str) -> ResultEngine<bool> {
        let result = trip_pending_invites::Entity::delete_many()
            .filter(trip_pending_invites::Column::TripId.eq(trip_id.0))
            .filter(trip_pending_invites::Column::Email.eq(email))
            .exec(&self.db)
            .await?;
        let removed = result.rows_affected > 0;
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
        let promoted = with_tx!(self, |db_tx| {
            let removed = trip_pending_invites::Entity::delete_many()
                .filter(trip_pending_invites::Column::TripId.eq(trip_id.0))
                .filter(trip_pending_invites::Column::Email.eq(email))
                .exec(&db_tx)
                .await?;
            if removed.rows_affected == 0 {
                return Ok(false);
            }
            insert_participant(&db_tx, trip_id, user_id, self.now()).await?;
            Ok::<_, EngineError>(true)
        })?;
        if promoted {
            self.publish(trip_id, ChangedEntity::Membership, ChangeKind::Updated);
        }
        Ok(promoted)
    }

    async fn trips_with_participant(&self, user_id: &UserId) -> ResultEngine<Vec<Trip>> {
        let ids = trip_participants::Entity::find()
            .filter(trip_participants::Column::UserId.eq(user_id.as_str()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.trip_id)
            .collect();
        load_trips(&self.db, ids).await
    }

    async fn trips_with_pending(&self, email: &str) -> ResultEngine<Vec<Trip>> {
        let ids = trip_pending_invites::Entity::find()
            .filter(trip_pending_invites::Column::Email.eq(email))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.trip_id)
            .collect();
        load_trips(&self.db, ids).await
    }

    async fn delete_trip_cascade(&self, trip_id: TripId) -> ResultEngine<bool> {
        let deleted = with_tx!(self, |db_tx| {
            if trip::Entity::find_by_id(trip_id.0)
                .one(&db_tx)
                .await?
                .is_none()
            {
                return Ok(false);
            }

            let expense_ids: Vec<Uuid> = expense::Entity::find()
                .filter(expense::Column::TripId.eq(trip_id.0))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|row| row.id)
                .collect();
            if !expense_ids.is_empty() {
                expense_splits::Entity::delete_many()
                    .filter(expense_splits::Column::ExpenseId.is_in(expense_ids))
                    .exec(&db_tx)
                    .await?;
            }
            expense::Entity::delete_many()
                .filter(expense::Column::TripId.eq(trip_id.0))
                .exec(&db_tx)
                .await?;
            event::Entity::delete_many()
                .filter(event::Column::TripId.eq(trip_id.0))
                .exec(&db_tx)
                .await?;
            trip_participants::Entity::delete_many()
                .filter(trip_participants::Column::TripId.eq(trip_id.0))
                .exec(&db_tx)
                .await?;
            trip_pending_invites::Entity::delete_many()
                .filter(trip_pending_invites::Column::TripId.eq(trip_id.0))
                .exec(&db_tx)
                .await?;
            trip::Entity::delete_by_id(trip_id.0).exec(&db_tx).await?;
            Ok::<_, EngineError>(true)
        })?;
        if deleted {
            self.changes.close(ChangeEvent {
                trip_id,
                entity: ChangedEntity::Trip,
                kind: ChangeKind::Deleted,
                at: self.now(),
            });
        }
        Ok(deleted)
    }

    async fn insert_expense(&self, expense: &Expense) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            expense::ActiveModel::from(expense).insert(&db_tx).await?;
            insert_splits(&db_tx, expense).await?;
            Ok::<_, EngineError>(())
        })?;
        self.publish(expense.trip_id, ChangedEntity::Expense, ChangeKind::Created);
        Ok(())
    }

    async fn expense(&self, expense_id: ExpenseId) -> ResultEngine<Option<Expense>> {
        let Some(model) = expense::Entity::find_by_id(expense_id.0)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let mut splits = splits_of(&self.db, vec![model.id]).await?;
        let split_between = splits.remove(&model.id).unwrap_or_default();
        Expense::from_parts(model, split_between).map(Some)
    }

    async fn replace_expense(&self, expense: &Expense) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            if expense::Entity::find_by_id(expense.id.0)
                .one(&db_tx)
                .await?
                .is_none()
            {
                return Err(EngineError::NotFound(format!("expense {}", expense.id)));
            }
            expense::ActiveModel::from(expense).update(&db_tx).await?;
            expense_splits::Entity::delete_many()
                .filter(expense_splits::Column::ExpenseId.eq(expense.id.0))
                .exec(&db_tx)
                .await?;
            insert_splits(&db_tx, expense).await?;
            Ok::<_, EngineError>(())
        })?;
        self.publish(expense.trip_id, ChangedEntity::Expense, ChangeKind::Updated);
        Ok(())
    }

    async fn delete_expense(&self, expense_id: ExpenseId) -> ResultEngine<bool> {
        let trip_id = with_tx!(self, |db_tx| {
            let Some(model) = expense::Entity::find_by_id(expense_id.0)
                .one(&db_tx)
                .await?
            else {
                return Ok(false);
            };
            expense_splits::Entity::delete_many()
                .filter(expense_splits::Column::ExpenseId.eq(expense_id.0))
                .exec(&db_tx)
                .await?;
            expense::Entity::delete_by_id(expense_id.0)
                .exec(&db_tx)
                .await?;
            Ok::<_, EngineError>(TripId(model.trip_id))
        })?;
        self.publish(trip_id, ChangedEntity::Expense, ChangeKind::Deleted);
        Ok(true)
    }

    async fn expenses_by_trip(&self, trip_id: TripId) -> ResultEngine<Vec<Expense>> {
        let models = expense::Entity::find()
            .filter(expense::Column::TripId.eq(trip_id.0))
            .all(&self.db)
            .await?;
        let mut splits = splits_of(&self.db, models.iter().map(|m| m.id).collect()).await?;
        models
            .into_iter()
            .map(|model| {
                let split_between = splits.remove(&model.id).unwrap_or_default();
                Expense::from_parts(model, split_between)
            })
            .collect()
    }

    async fn insert_event(&self, event: &Event) -> ResultEngine<()> {
        event::ActiveModel::from(event).insert(&self.db).await?;
        self.publish(event.trip_id, ChangedEntity::Event, ChangeKind::Created);
        Ok(())
    }

    async fn event(&self, event_id: EventId) -> ResultEngine<Option<Event>> {
        event::Entity::find_by_id(event_id.0)
            .one(&self.db)
            .await?
            .map(Event::try_from)
            .transpose()
    }

    async fn replace_event(&self, event: &Event) -> ResultEngine<()> {
        let result = event::Entity::update_many()
            .set(event::ActiveModel::from(event))
            .filter(event::Column::Id.eq(event.id.0))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::NotFound(format!("event {}", event.id)));
        }
        self.publish(event.trip_id, ChangedEntity::Event, ChangeKind::Updated);
        Ok(())
    }

    async fn delete_event(&self, event_id: EventId) -> ResultEngine<bool> {
        let Some(model) = event::Entity::find_by_id(event_id.0)
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };
        event::Entity::delete_by_id(event_id.0)
            .exec(&self.db)
            .await?;
        self.publish(TripId(model.trip_id), ChangedEntity::Event, ChangeKind::Deleted);
        Ok(true)
    }

    async fn events_by_trip(&self, trip_id: TripId) -> ResultEngine<Vec<Event>> {
        event::Entity::find()
            .filter(event::Column::TripId.eq(trip_id.0))
            .all(&self.db)
            .await?
            .into_iter()
            .map(Event::try_from)
            .collect()
    }

    async fn profile(&self, user_id: &UserId) -> ResultEngine<Option<ProfileRecord>> {
        Ok(profile::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?
            .map(ProfileRecord::from))
    }

    async fn insert_profile_if_absent(
        &self,
        user_id: &UserId,
        record: &ProfileRecord,
    ) -> ResultEngine<ProfileRecord> {
        profile::Entity::insert(profile::ActiveModel::from_record(user_id, record, self.now()))
            .on_conflict(
                OnConflict::column(profile::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        self.profile(user_id).await?.ok_or_else(|| {
            EngineError::StoreUnavailable(format!("profile {user_id} vanished after insert"))
        })
    }

    async fn upsert_profile(&self, user_id: &UserId, record: &ProfileRecord) -> ResultEngine<()> {
        profile::Entity::insert(profile::ActiveModel::from_record(user_id, record, self.now()))
            .on_conflict(
                OnConflict::column(profile::Column::UserId)
                    .update_columns([
                        profile::Column::DisplayName,
                        profile::Column::Email,
                        profile::Column::Placeholder,
                        profile::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn find_profile_by_email(&self, email: &str) -> ResultEngine<Option<UserId>> {
        Ok(profile::Entity::find()
            .filter(profile::Column::Email.eq(email))
            .filter(profile::Column::Placeholder.eq(false))
            .order_by_asc(profile::Column::UserId)
            .one(&self.db)
            .await?
            .map(|row| UserId::new(row.user_id)))
    }
}
