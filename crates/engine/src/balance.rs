//! Balance engine: a pure function of (ledger snapshot, membership snapshot).
//!
//! Nothing here touches the store, so the report can be recomputed from
//! whatever snapshot is currently visible and unit tested in isolation.
//!
//! - Only `Paid` expenses take part in settlement math; `Pending` ones are
//!   reported in `total_pending` and in the category totals.
//! - Each expense is split into per-person shares with [`Money::split_evenly`],
//!   so the shares of an expense always add back up to its amount.
//! - `balance = paid - owed`; a balance within the settle tolerance of zero is
//!   [`Standing::Settled`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Category, Expense, ExpenseStatus, Money, UserId};

/// Knobs of the balance computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalancePolicy {
    /// Largest absolute balance still reported as settled.
    pub settle_tolerance: Money,
    /// Report every current participant, even with no recorded activity.
    pub include_idle_participants: bool,
}

impl Default for BalancePolicy {
    fn default() -> Self {
        Self {
            settle_tolerance: Money::new(1),
            include_idle_participants: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    Settled,
    /// Paid more than their share; the others owe them.
    IsOwed,
    Owes,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonBalance {
    pub paid: Money,
    pub owed: Money,
    pub balance: Money,
}

impl PersonBalance {
    #[must_use]
    pub fn standing(&self, tolerance: Money) -> Standing {
        if self.balance.abs() <= tolerance {
            Standing::Settled
        } else if self.balance.is_positive() {
            Standing::IsOwed
        } else {
            Standing::Owes
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub amount: Money,
    /// Share of the trip total, `0.0..=100.0`; zero when the total is zero.
    pub percentage: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub people: BTreeMap<UserId, PersonBalance>,
    /// Sum of `Paid` expenses.
    pub total_paid: Money,
    /// Sum of `Pending` expenses.
    pub total_pending: Money,
    /// Totals over every expense regardless of status.
    pub by_category: BTreeMap<Category, CategoryTotal>,
    pub settle_tolerance: Money,
}

impl BalanceReport {
    #[must_use]
    pub fn balance_of(&self, user_id: &UserId) -> Option<Money> {
        self.people.get(user_id).map(|p| p.balance)
    }

    #[must_use]
    pub fn standing_of(&self, user_id: &UserId) -> Option<Standing> {
        self.people
            .get(user_id)
            .map(|p| p.standing(self.settle_tolerance))
    }

    /// Sum of everything paid, as seen per person.
    #[must_use]
    pub fn total_paid_by_people(&self) -> Money {
        self.people.values().map(|p| p.paid).sum()
    }

    /// Sum of every share owed, as seen per person.
    #[must_use]
    pub fn total_owed_by_people(&self) -> Money {
        self.people.values().map(|p| p.owed).sum()
    }

    /// Grand total across both statuses.
    #[must_use]
    pub fn total(&self) -> Money {
        self.total_paid + self.total_pending
    }
}

/// Derive paid/owed/balance per person plus the trip aggregates.
///
/// Only defined over records that passed ledger validation.
#[must_use]
pub fn compute_balances(
    expenses: &[Expense],
    participants: &BTreeSet<UserId>,
    policy: &BalancePolicy,
) -> BalanceReport {
    let mut people: BTreeMap<UserId, PersonBalance> = BTreeMap::new();
    if policy.include_idle_participants {
        for participant in participants {
            people.entry(participant.clone()).or_default();
        }
    }

    let mut total_paid = Money::ZERO;
    let mut total_pending = Money::ZERO;
    let mut category_amounts: BTreeMap<Category, Money> = BTreeMap::new();

    for expense in expenses {
        *category_amounts.entry(expense.category).or_default() += expense.amount;

        if expense.status == ExpenseStatus::Pending {
            total_pending += expense.amount;
            continue;
        }
        total_paid += expense.amount;

        people.entry(expense.paid_by.clone()).or_default().paid += expense.amount;

        let shares = expense.amount.split_evenly(expense.split_between.len());
        for (person, share) in expense.split_between.iter().zip(shares) {
            people.entry(person.clone()).or_default().owed += share;
        }
    }

    for person in people.values_mut() {
        person.balance = person.paid - person.owed;
    }

    let grand_total = total_paid + total_pending;
    let by_category = category_amounts
        .into_iter()
        .map(|(category, amount)| {
            let percentage = if grand_total.is_zero() {
                0.0
            } else {
                amount.as_major_f64() / grand_total.as_major_f64() * 100.0
            };
            (category, CategoryTotal { amount, percentage })
        })
        .collect();

    BalanceReport {
        people,
        total_paid,
        total_pending,
        by_category,
        settle_tolerance: policy.settle_tolerance,
    }
}
