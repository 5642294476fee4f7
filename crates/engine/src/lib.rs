//! Collaborative trip core: membership directory, invitations, expense
//! ledger, balances and trip lifecycle over a pluggable [`Store`].

pub use balance::{
    BalancePolicy, BalanceReport, CategoryTotal, PersonBalance, Standing, compute_balances,
};
pub use commands::{
    AuthIdentity, EventDraft, EventPatch, ExpenseDraft, ExpensePatch, NewTrip, Split, TripPatch,
};
pub use currency::Currency;
pub use error::{EngineError, ErrorKind, ValidationError};
pub use event::{Event, EventKind};
pub use expense::{Category, Expense, ExpenseStatus};
pub use ids::{EventId, ExpenseId, TripId, UserId};
pub use money::Money;
pub use ops::{
    Engine, EngineBuilder, EngineSettings, InviteOutcome, TripList, TripMembers, ensure_writable,
};
pub use profile::{ProfileRecord, UNKNOWN_EMAIL};
pub use store::{
    ChangeBus, ChangeEvent, ChangeKind, ChangeStream, ChangedEntity, MemoryStore, SqliteStore,
    Store,
};
pub use summary::{Activity, ActivityKind, TripSummary};
pub use trip::{Countdown, Trip, TripStatus};
pub use util::normalize_email;
pub use watch::BalanceWatcher;

mod balance;
mod commands;
mod currency;
mod error;
mod event;
mod expense;
mod expense_splits;
mod ids;
mod money;
mod ops;
mod profile;
pub mod store;
mod summary;
mod trip;
mod trip_participants;
mod trip_pending_invites;
mod util;
mod watch;

type ResultEngine<T> = Result<T, EngineError>;
