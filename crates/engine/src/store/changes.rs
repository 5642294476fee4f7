//! Per-trip change notifications using tokio broadcast channels.
//!
//! Notifications only travel within the process that owns the store. A
//! subscriber that falls behind loses the skipped events and should
//! recompute from a fresh snapshot, which is all the balance watcher does
//! anyway.

use std::{pin::Pin, sync::Arc};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use crate::TripId;

const CHANNEL_CAPACITY: usize = 100;

/// Which part of the trip document changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedEntity {
    Trip,
    Membership,
    Expense,
    Event,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub trip_id: TripId,
    pub entity: ChangedEntity,
    pub kind: ChangeKind,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    /// `true` when the change can move balances.
    #[must_use]
    pub fn affects_balances(&self) -> bool {
        matches!(
            self.entity,
            ChangedEntity::Trip | ChangedEntity::Membership | ChangedEntity::Expense
        )
    }

    /// `true` when the trip itself is gone and no further events will follow.
    #[must_use]
    pub fn is_trip_deleted(&self) -> bool {
        self.entity == ChangedEntity::Trip && self.kind == ChangeKind::Deleted
    }
}

/// Stream of change events for one trip. Ends when the trip is deleted.
pub type ChangeStream = Pin<Box<dyn Stream<Item = ChangeEvent> + Send>>;

/// Broadcast channels keyed by trip, created on first use.
#[derive(Clone, Debug, Default)]
pub struct ChangeBus {
    channels: Arc<DashMap<TripId, broadcast::Sender<ChangeEvent>>>,
}

impl ChangeBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes while holding the entry, so a concurrent prune can never
    /// drop the sender between creation and subscription.
    fn receiver(&self, trip_id: TripId) -> broadcast::Receiver<ChangeEvent> {
        self.channels
            .entry(trip_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Notify every subscriber of the trip. Having none is fine; a channel
    /// whose subscribers are all gone is dropped.
    pub fn publish(&self, event: ChangeEvent) {
        let trip_id = event.trip_id;
        let Some(tx) = self.channels.get(&trip_id).map(|tx| tx.clone()) else {
            return;
        };
        if tx.send(event).is_err() {
            self.channels
                .remove_if(&trip_id, |_, tx| tx.receiver_count() == 0);
        }
    }

    pub fn subscribe(&self, trip_id: TripId) -> ChangeStream {
        self.prune();
        let rx = self.receiver(trip_id);
        let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!(%trip_id, "change subscriber lagged: {err}");
                None
            }
        });
        Box::pin(stream)
    }

    /// Publish the final event of a trip and drop its channel, ending every
    /// open stream.
    pub fn close(&self, event: ChangeEvent) {
        if let Some((_, tx)) = self.channels.remove(&event.trip_id) {
            let _ = tx.send(event);
        }
    }

    /// Drops every channel nobody listens to any more.
    pub fn prune(&self) {
        self.channels.retain(|_, tx| tx.receiver_count() > 0);
    }

    #[must_use]
    pub fn subscriber_count(&self, trip_id: TripId) -> usize {
        self.channels
            .get(&trip_id)
            .map_or(0, |tx| tx.receiver_count())
    }
}
