//! Demo trip used when `seed_demo` is set.

use chrono::{NaiveDate, TimeZone, Utc};
use engine::{
    AuthIdentity, Category, Currency, Engine, EventDraft, EventKind, ExpenseDraft, ExpenseStatus,
    EngineError, Money, NewTrip, TripId, UserId,
};

pub const DEMO_OWNER: &str = "user-ana";
const DEMO_FRIEND: &str = "user-bruno";

fn day(d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2026, 3, d)
}

/// Two travellers in Paris, a handful of itinerary items, a shared ledger and
/// one invite still waiting for its account.
pub async fn seed(engine: &Engine) -> Result<TripId, EngineError> {
    let ana = UserId::from(DEMO_OWNER);
    let bruno = UserId::from(DEMO_FRIEND);
    engine
        .on_authenticated(AuthIdentity::new(ana.clone(), "ana@example.com").display_name("Ana"))
        .await?;
    engine
        .on_authenticated(
            AuthIdentity::new(bruno.clone(), "bruno@example.com").display_name("Bruno"),
        )
        .await?;

    let mut new_trip = NewTrip::new("Paris in spring", "Paris, France")
        .description("A week between museums and bistros")
        .currency(Currency::Eur);
    if let (Some(start), Some(end)) = (day(15), day(22)) {
        new_trip = new_trip.dates(start, end);
    }
    let trip = engine.create_trip(new_trip, &ana).await?;
    engine.invite(trip.id, "bruno@example.com", &ana).await?;
    engine.invite(trip.id, "carla@example.com", &ana).await?;

    let events = [
        (EventKind::Flight, "Flight GRU to CDG", 15, 22, "GRU Terminal 3"),
        (EventKind::Transfer, "Airport to hotel", 16, 11, "Charles de Gaulle"),
        (EventKind::Lodging, "Check-in Hotel Le Marais", 16, 14, "Rue de Rivoli"),
        (EventKind::Activity, "Eiffel Tower", 17, 10, "Champ de Mars"),
        (EventKind::Meal, "Lunch at Le Jules Verne", 17, 13, "Eiffel Tower, 2nd floor"),
    ];
    for (kind, title, d, hour, location) in events {
        let Some(occurs_at) = Utc.with_ymd_and_hms(2026, 3, d, hour, 0, 0).single() else {
            continue;
        };
        engine
            .add_event(
                trip.id,
                EventDraft::new(kind, title, occurs_at).location(location),
                &ana,
            )
            .await?;
    }

    let expenses = [
        (Category::Flights, "Return flights", 650_000, &ana, ExpenseStatus::Paid, 10),
        (Category::Lodging, "Hotel Le Marais, 6 nights", 420_000, &bruno, ExpenseStatus::Paid, 16),
        (Category::Tours, "Eiffel Tower tickets", 18_000, &ana, ExpenseStatus::Paid, 17),
        (Category::Food, "Le Jules Verne", 85_000, &bruno, ExpenseStatus::Paid, 17),
        (Category::Tours, "Versailles day trip", 38_000, &ana, ExpenseStatus::Pending, 20),
    ];
    for (category, description, minor, payer, status, d) in expenses {
        let Some(date) = day(d) else {
            continue;
        };
        engine
            .add_expense(
                trip.id,
                ExpenseDraft::new(description, Money::new(minor), payer.clone(), date)
                    .category(category)
                    .status(status),
                &ana,
            )
            .await?;
    }

    tracing::info!(trip_id = %trip.id, "demo trip seeded");
    Ok(trip.id)
}
