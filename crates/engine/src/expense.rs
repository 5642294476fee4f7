//! Expense records of a trip ledger.
//!
//! An `Expense` is paid by one participant and split evenly among a non-empty
//! subset of participants. Records are validated against the trip membership
//! at write time; the balance engine assumes every stored record is valid.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ExpenseId, Money, ResultEngine, Trip, TripId, UserId, ValidationError};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    #[default]
    Paid,
    Pending,
}

impl ExpenseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
        }
    }
}

impl TryFrom<&str> for ExpenseStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "paid" => Ok(Self::Paid),
            "pending" => Ok(Self::Pending),
            other => Err(EngineError::Corrupt(format!("invalid expense status: {other}"))),
        }
    }
}

/// Spending category of an expense.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Flights,
    Transfer,
    Lodging,
    Tours,
    Food,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Flights,
        Self::Transfer,
        Self::Lodging,
        Self::Tours,
        Self::Food,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flights => "flights",
            Self::Transfer => "transfer",
            Self::Lodging => "lodging",
            Self::Tours => "tours",
            Self::Food => "food",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for Category {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| EngineError::Corrupt(format!("invalid category: {value}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub trip_id: TripId,
    pub category: Category,
    pub description: String,
    pub amount: Money,
    pub paid_by: UserId,
    pub split_between: BTreeSet<UserId>,
    pub date: NaiveDate,
    pub status: ExpenseStatus,
    pub created_by: UserId,
    /// Ledger write time, assigned by the store.
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Expense {
    /// Checks amount, payer and split against the trip membership, reporting
    /// the first violated rule in that order.
    pub fn validate(&self, trip: &Trip) -> ResultEngine<()> {
        validate_fields(trip, self.amount, &self.paid_by, &self.split_between)
    }

    pub(crate) fn from_parts(model: Model, split_between: BTreeSet<UserId>) -> ResultEngine<Self> {
        Ok(Self {
            id: ExpenseId(model.id),
            trip_id: TripId(model.trip_id),
            category: Category::try_from(model.category.as_str())?,
            description: model.description,
            amount: Money::new(model.amount_minor),
            paid_by: UserId::new(model.paid_by),
            split_between,
            date: model.date,
            status: ExpenseStatus::try_from(model.status.as_str())?,
            created_by: UserId::new(model.created_by),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

pub(crate) fn validate_fields(
    trip: &Trip,
    amount: Money,
    paid_by: &UserId,
    split_between: &BTreeSet<UserId>,
) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(ValidationError::InvalidAmount.into());
    }
    if amount > Money::MAX_EXPENSE {
        return Err(ValidationError::AmountTooLarge(amount.to_string()).into());
    }
    if !trip.is_participant(paid_by) {
        return Err(ValidationError::PayerNotParticipant(paid_by.to_string()).into());
    }
    if split_between.is_empty() {
        return Err(ValidationError::EmptySplit.into());
    }
    if let Some(outsider) = split_between.iter().find(|p| !trip.is_participant(p)) {
        return Err(ValidationError::SplitNotParticipant(outsider.to_string()).into());
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub trip_id: Uuid,
    pub category: String,
    pub description: String,
    pub amount_minor: i64,
    pub paid_by: String,
    pub date: Date,
    pub status: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense_splits::Entity")]
    Splits,
}

impl Related<super::expense_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Splits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.0),
            trip_id: ActiveValue::Set(expense.trip_id.0),
            category: ActiveValue::Set(expense.category.as_str().to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount.minor()),
            paid_by: ActiveValue::Set(expense.paid_by.to_string()),
            date: ActiveValue::Set(expense.date),
            status: ActiveValue::Set(expense.status.as_str().to_string()),
            created_by: ActiveValue::Set(expense.created_by.to_string()),
            created_at: ActiveValue::Set(expense.created_at),
            updated_at: ActiveValue::Set(expense.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip_with(members: &[&str]) -> Trip {
        let mut trip = Trip::new(
            "Paris".to_string(),
            "Paris, France".to_string(),
            UserId::from(members[0]),
            Utc::now(),
        );
        trip.participants = members.iter().map(|m| UserId::from(*m)).collect();
        trip
    }

    fn split(members: &[&str]) -> BTreeSet<UserId> {
        members.iter().map(|m| UserId::from(*m)).collect()
    }

    #[test]
    fn amount_is_checked_before_payer_and_split() {
        let trip = trip_with(&["a", "b"]);
        let err = validate_fields(&trip, Money::ZERO, &UserId::from("z"), &BTreeSet::new());
        assert_eq!(err, Err(ValidationError::InvalidAmount.into()));
    }

    #[test]
    fn payer_is_checked_before_split() {
        let trip = trip_with(&["a", "b"]);
        let err = validate_fields(&trip, Money::major(1), &UserId::from("z"), &BTreeSet::new());
        assert_eq!(
            err,
            Err(ValidationError::PayerNotParticipant("z".to_string()).into())
        );
    }

    #[test]
    fn split_must_be_a_non_empty_subset() {
        let trip = trip_with(&["a", "b"]);
        let payer = UserId::from("a");
        assert_eq!(
            validate_fields(&trip, Money::major(1), &payer, &BTreeSet::new()),
            Err(ValidationError::EmptySplit.into())
        );
        assert_eq!(
            validate_fields(&trip, Money::major(1), &payer, &split(&["a", "c"])),
            Err(ValidationError::SplitNotParticipant("c".to_string()).into())
        );
        assert!(validate_fields(&trip, Money::major(1), &payer, &split(&["a", "b"])).is_ok());
    }
}
