//! Itinerary events of a trip (flights, transfers, lodging, activities,
//! meals). Owned by their trip and removed with it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, EventId, ResultEngine, TripId, UserId};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Flight,
    Transfer,
    Lodging,
    Activity,
    Meal,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::Flight,
        Self::Transfer,
        Self::Lodging,
        Self::Activity,
        Self::Meal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Transfer => "transfer",
            Self::Lodging => "lodging",
            Self::Activity => "activity",
            Self::Meal => "meal",
        }
    }
}

impl TryFrom<&str> for EventKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == value)
            .ok_or_else(|| EngineError::Corrupt(format!("invalid event kind: {value}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub trip_id: TripId,
    pub kind: EventKind,
    pub title: String,
    pub occurs_at: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub trip_id: Uuid,
    pub kind: String,
    pub title: String,
    pub occurs_at: DateTimeUtc,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trip::Entity",
        from = "Column::TripId",
        to = "super::trip::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Trips,
}

impl Related<super::trip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Event> for ActiveModel {
    fn from(event: &Event) -> Self {
        Self {
            id: ActiveValue::Set(event.id.0),
            trip_id: ActiveValue::Set(event.trip_id.0),
            kind: ActiveValue::Set(event.kind.as_str().to_string()),
            title: ActiveValue::Set(event.title.clone()),
            occurs_at: ActiveValue::Set(event.occurs_at),
            location: ActiveValue::Set(event.location.clone()),
            description: ActiveValue::Set(event.description.clone()),
            created_by: ActiveValue::Set(event.created_by.to_string()),
            created_at: ActiveValue::Set(event.created_at),
            updated_at: ActiveValue::Set(event.updated_at),
        }
    }
}

impl TryFrom<Model> for Event {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: EventId(model.id),
            trip_id: TripId(model.trip_id),
            kind: EventKind::try_from(model.kind.as_str())?,
            title: model.title,
            occurs_at: model.occurs_at,
            location: model.location,
            description: model.description,
            created_by: UserId::new(model.created_by),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
