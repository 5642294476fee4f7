//! The `Trip` groups participants, itinerary events and the expense ledger.
//!
//! A trip owns only the *set* of participant ids; profile data lives in the
//! membership directory.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{Currency, EngineError, ResultEngine, TripId, UserId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    Active,
    Archived,
}

impl TripStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl TryFrom<&str> for TripStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(EngineError::Corrupt(format!("invalid trip status: {other}"))),
        }
    }
}

/// Where `now` falls relative to the trip dates (UTC calendar days).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Countdown {
    /// No start date yet.
    Unscheduled,
    /// `days` calendar days to go; `hours` and `minutes` are the remainder
    /// until midnight of the first day.
    Upcoming { days: i64, hours: i64, minutes: i64 },
    /// Running; the first day is day 1.
    InProgress { day_of_trip: i64 },
    /// Past `ends_on`.
    Ended { day_of_trip: i64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub name: String,
    pub destination: String,
    pub description: Option<String>,
    pub currency: Currency,
    pub created_by: UserId,
    pub participants: BTreeSet<UserId>,
    pub pending_participants: BTreeSet<String>,
    pub status: TripStatus,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Trip {
    /// Build a new active trip whose only participant is its creator.
    pub fn new(
        name: String,
        destination: String,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TripId::new(),
            name,
            destination,
            description: None,
            currency: Currency::default(),
            participants: BTreeSet::from([created_by.clone()]),
            pending_participants: BTreeSet::new(),
            created_by,
            status: TripStatus::Active,
            starts_on: None,
            ends_on: None,
            created_at,
            ended_at: None,
        }
    }

    #[must_use]
    pub fn is_participant(&self, user_id: &UserId) -> bool {
        self.participants.contains(user_id)
    }

    #[must_use]
    pub fn is_creator(&self, user_id: &UserId) -> bool {
        &self.created_by == user_id
    }

    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.status == TripStatus::Archived
    }

    #[must_use]
    pub fn is_pending(&self, email: &str) -> bool {
        self.pending_participants.contains(email)
    }

    #[must_use]
    pub fn countdown(&self, now: DateTime<Utc>) -> Countdown {
        let Some(starts_on) = self.starts_on else {
            return Countdown::Unscheduled;
        };
        let today = now.date_naive();
        let days = (starts_on - today).num_days();
        if days > 0 {
            let left = starts_on.and_time(NaiveTime::MIN).and_utc() - now;
            return Countdown::Upcoming {
                days,
                hours: left.num_hours() % 24,
                minutes: left.num_minutes() % 60,
            };
        }

        let day_of_trip = 1 - days;
        match self.ends_on {
            Some(ends_on) if today > ends_on => Countdown::Ended { day_of_trip },
            _ => Countdown::InProgress { day_of_trip },
        }
    }

    /// Rebuild a trip from its row plus the membership sets stored beside it.
    pub(crate) fn from_parts(
        model: Model,
        participants: BTreeSet<UserId>,
        pending_participants: BTreeSet<String>,
    ) -> ResultEngine<Self> {
        Ok(Self {
            id: TripId(model.id),
            name: model.name,
            destination: model.destination,
            description: model.description,
            currency: Currency::try_from(model.currency.as_str()).map_err(|_| {
                EngineError::Corrupt(format!("invalid trip currency: {}", model.currency))
            })?,
            created_by: UserId::new(model.created_by),
            participants,
            pending_participants,
            status: TripStatus::try_from(model.status.as_str())?,
            starts_on: model.starts_on,
            ends_on: model.ends_on,
            created_at: model.created_at,
            ended_at: model.ended_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "trips")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub destination: String,
    pub description: Option<String>,
    pub currency: String,
    pub created_by: String,
    pub status: String,
    pub starts_on: Option<Date>,
    pub ends_on: Option<Date>,
    pub created_at: DateTimeUtc,
    pub ended_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::trip_participants::Entity")]
    Participants,
    #[sea_orm(has_many = "super::trip_pending_invites::Entity")]
    PendingInvites,
}

impl Related<super::trip_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::trip_pending_invites::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PendingInvites.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Trip> for ActiveModel {
    fn from(trip: &Trip) -> Self {
        Self {
            id: ActiveValue::Set(trip.id.0),
            name: ActiveValue::Set(trip.name.clone()),
            destination: ActiveValue::Set(trip.destination.clone()),
            description: ActiveValue::Set(trip.description.clone()),
            currency: ActiveValue::Set(trip.currency.code().to_string()),
            created_by: ActiveValue::Set(trip.created_by.to_string()),
            status: ActiveValue::Set(trip.status.as_str().to_string()),
            starts_on: ActiveValue::Set(trip.starts_on),
            ends_on: ActiveValue::Set(trip.ends_on),
            created_at: ActiveValue::Set(trip.created_at),
            ended_at: ActiveValue::Set(trip.ended_at),
        }
    }
}
