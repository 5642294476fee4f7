//! Retrospective aggregates and the activity feed of a trip.
//!
//! Pure functions over snapshots, like the balance engine. Rendering them
//! into prose or documents is left to the presentation layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Category, Event, EventKind, Expense, Money, Trip, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSummary {
    pub participant_count: usize,
    pub event_count: usize,
    pub expense_count: usize,
    /// Sum of every expense regardless of status.
    pub total_spent: Money,
    pub events_by_kind: BTreeMap<EventKind, usize>,
    pub most_common_event: Option<(EventKind, usize)>,
    pub spent_by_person: BTreeMap<UserId, Money>,
    pub top_spender: Option<(UserId, Money)>,
    pub spent_by_category: BTreeMap<Category, Money>,
    pub top_category: Option<(Category, Money)>,
    pub first_event_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
}

#[must_use]
pub fn summarize(trip: &Trip, events: &[Event], expenses: &[Expense]) -> TripSummary {
    let mut events_by_kind: BTreeMap<EventKind, usize> = BTreeMap::new();
    for event in events {
        *events_by_kind.entry(event.kind).or_default() += 1;
    }

    let mut spent_by_person: BTreeMap<UserId, Money> = BTreeMap::new();
    let mut spent_by_category: BTreeMap<Category, Money> = BTreeMap::new();
    for expense in expenses {
        *spent_by_person.entry(expense.paid_by.clone()).or_default() += expense.amount;
        *spent_by_category.entry(expense.category).or_default() += expense.amount;
    }

    TripSummary {
        participant_count: trip.participants.len(),
        event_count: events.len(),
        expense_count: expenses.len(),
        total_spent: expenses.iter().map(|e| e.amount).sum(),
        most_common_event: top_entry(&events_by_kind),
        events_by_kind,
        top_spender: top_entry(&spent_by_person),
        spent_by_person,
        top_category: top_entry(&spent_by_category),
        spent_by_category,
        first_event_at: events.iter().map(|e| e.occurs_at).min(),
        last_event_at: events.iter().map(|e| e.occurs_at).max(),
    }
}

/// Largest value; ties go to the smallest key so the result is stable.
fn top_entry<K: Ord + Clone, V: Ord + Copy>(map: &BTreeMap<K, V>) -> Option<(K, V)> {
    let mut best: Option<(&K, V)> = None;
    for (key, value) in map {
        if best.is_none_or(|(_, current)| *value > current) {
            best = Some((key, *value));
        }
    }
    best.map(|(k, v)| (k.clone(), v))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityKind {
    Event { kind: EventKind },
    Expense { category: Category, amount: Money },
}

/// One entry of the collaborative activity feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub at: DateTime<Utc>,
    pub actor: UserId,
    pub title: String,
    pub kind: ActivityKind,
}

/// Events and expenses merged into one feed, newest first.
#[must_use]
pub fn activity_feed(events: &[Event], expenses: &[Expense], limit: usize) -> Vec<Activity> {
    let mut feed: Vec<Activity> = events
        .iter()
        .map(|event| Activity {
            at: event.updated_at.unwrap_or(event.created_at),
            actor: event.created_by.clone(),
            title: event.title.clone(),
            kind: ActivityKind::Event { kind: event.kind },
        })
        .chain(expenses.iter().map(|expense| Activity {
            at: expense.updated_at.unwrap_or(expense.created_at),
            actor: expense.created_by.clone(),
            title: expense.description.clone(),
            kind: ActivityKind::Expense {
                category: expense.category,
                amount: expense.amount,
            },
        }))
        .collect();
    feed.sort_by(|a, b| b.at.cmp(&a.at));
    feed.truncate(limit);
    feed
}
