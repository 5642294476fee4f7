//! Command structs for engine operations.
//!
//! These types group parameters for write operations (trip, expense, event,
//! authentication), keeping call sites readable and avoiding long argument
//! lists.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{Category, Currency, EventKind, ExpenseStatus, Money, UserId};

/// Create a trip. The caller becomes its creator and sole participant.
#[derive(Clone, Debug)]
pub struct NewTrip {
    pub name: String,
    pub destination: String,
    pub description: Option<String>,
    pub currency: Currency,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
}

impl NewTrip {
    #[must_use]
    pub fn new(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            destination: destination.into(),
            description: None,
            currency: Currency::default(),
            starts_on: None,
            ends_on: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn dates(mut self, starts_on: NaiveDate, ends_on: NaiveDate) -> Self {
        self.starts_on = Some(starts_on);
        self.ends_on = Some(ends_on);
        self
    }
}

/// Edit trip details. `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct TripPatch {
    pub name: Option<String>,
    pub destination: Option<String>,
    pub description: Option<Option<String>>,
    pub starts_on: Option<Option<NaiveDate>>,
    pub ends_on: Option<Option<NaiveDate>>,
}

/// Who shares an expense when the caller does not pick people explicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Split {
    /// Every current participant of the trip at write time.
    #[default]
    AllParticipants,
    /// Only the payer (a personal expense recorded in the shared ledger).
    PayerOnly,
    /// An explicit set; must be a non-empty subset of the participants.
    Between(BTreeSet<UserId>),
}

impl Split {
    #[must_use]
    pub fn between<I, U>(members: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        Self::Between(members.into_iter().map(Into::into).collect())
    }

    pub(crate) fn resolve(&self, payer: &UserId, participants: &BTreeSet<UserId>) -> BTreeSet<UserId> {
        match self {
            Self::AllParticipants => participants.clone(),
            Self::PayerOnly => BTreeSet::from([payer.clone()]),
            Self::Between(members) => members.clone(),
        }
    }
}

/// Record a new expense.
#[derive(Clone, Debug)]
pub struct ExpenseDraft {
    pub category: Category,
    pub description: String,
    pub amount: Money,
    pub paid_by: UserId,
    pub split: Split,
    pub date: NaiveDate,
    pub status: ExpenseStatus,
}

impl ExpenseDraft {
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        amount: Money,
        paid_by: impl Into<UserId>,
        date: NaiveDate,
    ) -> Self {
        Self {
            category: Category::default(),
            description: description.into(),
            amount,
            paid_by: paid_by.into(),
            split: Split::default(),
            date,
            status: ExpenseStatus::default(),
        }
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn split(mut self, split: Split) -> Self {
        self.split = split;
        self
    }

    #[must_use]
    pub fn split_between<I, U>(self, members: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        self.split(Split::between(members))
    }

    #[must_use]
    pub fn status(mut self, status: ExpenseStatus) -> Self {
        self.status = status;
        self
    }
}

/// Edit an expense. The merged record is validated like a new one.
#[derive(Clone, Debug, Default)]
pub struct ExpensePatch {
    pub category: Option<Category>,
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub paid_by: Option<UserId>,
    pub split_between: Option<BTreeSet<UserId>>,
    pub date: Option<NaiveDate>,
    pub status: Option<ExpenseStatus>,
}

impl ExpensePatch {
    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn paid_by(mut self, paid_by: impl Into<UserId>) -> Self {
        self.paid_by = Some(paid_by.into());
        self
    }

    #[must_use]
    pub fn split_between<I, U>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        self.split_between = Some(members.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn status(mut self, status: ExpenseStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

/// Add an itinerary event.
#[derive(Clone, Debug)]
pub struct EventDraft {
    pub kind: EventKind,
    pub title: String,
    pub occurs_at: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl EventDraft {
    #[must_use]
    pub fn new(kind: EventKind, title: impl Into<String>, occurs_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            title: title.into(),
            occurs_at,
            location: None,
            description: None,
        }
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Edit an itinerary event. `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct EventPatch {
    pub kind: Option<EventKind>,
    pub title: Option<String>,
    pub occurs_at: Option<DateTime<Utc>>,
    pub location: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

/// Identity supplied by the authentication collaborator on sign-up/sign-in.
#[derive(Clone, Debug)]
pub struct AuthIdentity {
    pub user_id: UserId,
    pub email: String,
    pub display_name: Option<String>,
}

impl AuthIdentity {
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            display_name: None,
        }
    }

    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
