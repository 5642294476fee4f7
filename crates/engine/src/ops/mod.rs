use std::{fmt, sync::Arc};

use serde::Deserialize;

use crate::{BalancePolicy, EngineError, Money, ResultEngine, store::Store};

mod access;
mod balances;
mod directory;
mod events;
mod expenses;
mod invitations;
mod reports;
mod trips;

pub use access::ensure_writable;
pub use invitations::{InviteOutcome, TripMembers};
pub use trips::TripList;

/// Tunables of the ledger and lifecycle operations.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Largest absolute balance, in minor units, reported as settled.
    pub settle_tolerance_minor: i64,
    pub include_idle_participants: bool,
    /// How many times a trip-delete cascade is attempted before the store
    /// error is surfaced.
    pub cascade_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            settle_tolerance_minor: 1,
            include_idle_participants: true,
            cascade_attempts: 3,
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn balance_policy(&self) -> BalancePolicy {
        BalancePolicy {
            settle_tolerance: Money::new(self.settle_tolerance_minor.abs()),
            include_idle_participants: self.include_idle_participants,
        }
    }
}

/// Entry point of every trip, membership and ledger operation.
///
/// Cheap to clone: clones share the same store.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    settings: EngineSettings,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The store the engine reads and writes, for subscriptions.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    store: Option<Arc<dyn Store>>,
    settings: EngineSettings,
}

impl EngineBuilder {
    /// Pass the required store
    pub fn store(mut self, store: Arc<dyn Store>) -> EngineBuilder {
        self.store = Some(store);
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> EngineBuilder {
        self.settings = settings;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let store = self
            .store
            .ok_or_else(|| EngineError::StoreUnavailable("no store configured".to_string()))?;
        Ok(Engine {
            store,
            settings: self.settings,
        })
    }
}
