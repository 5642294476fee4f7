use crate::{
    EngineError, Expense, ExpenseDraft, ExpenseId, ExpensePatch, ResultEngine, TripId, UserId,
    expense::validate_fields,
    util::normalize_required_text,
};

use super::Engine;

impl Engine {
    async fn load_expense(&self, expense_id: ExpenseId) -> ResultEngine<Expense> {
        self.store
            .expense(expense_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("expense {expense_id}")))
    }

    /// Records an expense. Amount, payer and split are checked against the
    /// current participants and written together or not at all.
    pub async fn add_expense(
        &self,
        trip_id: TripId,
        draft: ExpenseDraft,
        actor: &UserId,
    ) -> ResultEngine<ExpenseId> {
        let trip = self.require_writable(trip_id, actor).await?;
        let split_between = draft.split.resolve(&draft.paid_by, &trip.participants);
        validate_fields(&trip, draft.amount, &draft.paid_by, &split_between)?;
        let description = normalize_required_text(&draft.description, "description")?;

        let expense = Expense {
            id: ExpenseId::new(),
            trip_id,
            category: draft.category,
            description,
            amount: draft.amount,
            paid_by: draft.paid_by,
            split_between,
            date: draft.date,
            status: draft.status,
            created_by: actor.clone(),
            created_at: self.store.now(),
            updated_at: None,
        };
        self.store.insert_expense(&expense).await?;
        tracing::debug!(%trip_id, expense_id = %expense.id, amount = %expense.amount, "expense added");
        Ok(expense.id)
    }

    /// Applies the patch and validates the merged record like a new one.
    pub async fn update_expense(
        &self,
        expense_id: ExpenseId,
        patch: ExpensePatch,
        actor: &UserId,
    ) -> ResultEngine<Expense> {
        let mut expense = self.load_expense(expense_id).await?;
        let trip = self.require_writable(expense.trip_id, actor).await?;

        if let Some(category) = patch.category {
            expense.category = category;
        }
        if let Some(description) = patch.description {
            expense.description = description;
        }
        if let Some(amount) = patch.amount {
            expense.amount = amount;
        }
        if let Some(paid_by) = patch.paid_by {
            expense.paid_by = paid_by;
        }
        if let Some(split_between) = patch.split_between {
            expense.split_between = split_between;
        }
        if let Some(date) = patch.date {
            expense.date = date;
        }
        if let Some(status) = patch.status {
            expense.status = status;
        }

        expense.validate(&trip)?;
        expense.description = normalize_required_text(&expense.description, "description")?;
        expense.updated_at = Some(self.store.now());

        self.store.replace_expense(&expense).await?;
        tracing::debug!(trip_id = %expense.trip_id, %expense_id, "expense updated");
        Ok(expense)
    }

    /// Any current participant may remove any expense of a writable trip.
    pub async fn remove_expense(&self, expense_id: ExpenseId, actor: &UserId) -> ResultEngine<()> {
        let expense = self.load_expense(expense_id).await?;
        self.require_writable(expense.trip_id, actor).await?;
        if !self.store.delete_expense(expense_id).await? {
            return Err(EngineError::NotFound(format!("expense {expense_id}")));
        }
        tracing::debug!(trip_id = %expense.trip_id, %expense_id, "expense removed");
        Ok(())
    }

    pub async fn expense(&self, expense_id: ExpenseId, actor: &UserId) -> ResultEngine<Expense> {
        let expense = self.load_expense(expense_id).await?;
        self.require_participant(expense.trip_id, actor).await?;
        Ok(expense)
    }

    /// Every expense of the trip, in no particular order.
    pub async fn list_expenses(&self, trip_id: TripId, actor: &UserId) -> ResultEngine<Vec<Expense>> {
        self.require_participant(trip_id, actor).await?;
        self.store.expenses_by_trip(trip_id).await
    }
}
