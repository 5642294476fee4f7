//! Live balance reports.
//!
//! A [`BalanceWatcher`] follows the change stream of one trip and recomputes
//! the report whenever the ledger or the membership moves. Readers get the
//! latest report through a `tokio::sync::watch` channel, so a reader that
//! shows up late still sees the current view.
//!
//! Every recompute re-checks the actor's membership. Once the actor has left
//! the trip the watcher stops, exactly as it does when the trip is deleted.

use futures::StreamExt;
use tokio::{sync::watch, task::JoinHandle};

use crate::{BalanceReport, Engine, EngineError, ErrorKind, ResultEngine, TripId, UserId};

#[derive(Debug)]
pub struct BalanceWatcher {
    trip_id: TripId,
    rx: watch::Receiver<BalanceReport>,
    task: JoinHandle<()>,
}

impl BalanceWatcher {
    /// Subscribes to the trip, computes the first report and starts the
    /// recompute task. `actor` must be a participant.
    pub async fn spawn(engine: Engine, trip_id: TripId, actor: &UserId) -> ResultEngine<Self> {
        let mut changes = engine.store().subscribe(trip_id);
        let initial = engine.trip_balances(trip_id, actor).await?;
        let (tx, rx) = watch::channel(initial);
        let actor = actor.clone();

        let task = tokio::spawn(async move {
            while let Some(change) = changes.next().await {
                if change.is_trip_deleted() {
                    tracing::debug!(%trip_id, "trip deleted, balance watcher stops");
                    break;
                }
                if !change.affects_balances() {
                    continue;
                }
                match engine.trip_balances(trip_id, &actor).await {
                    Ok(report) => {
                        if tx.send(report).is_err() {
                            break;
                        }
                    }
                    Err(err) if matches!(err.kind(), ErrorKind::Permission | ErrorKind::NotFound) => {
                        tracing::debug!(%trip_id, %actor, "watcher lost access, stopping: {err}");
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(%trip_id, "balance recompute failed: {err}");
                    }
                }
            }
        });

        Ok(Self { trip_id, rx, task })
    }

    pub fn trip_id(&self) -> TripId {
        self.trip_id
    }

    /// Latest report.
    pub fn current(&self) -> BalanceReport {
        self.rx.borrow().clone()
    }

    /// Independent receiver for another reader.
    pub fn subscribe(&self) -> watch::Receiver<BalanceReport> {
        self.rx.clone()
    }

    /// Waits for the next recomputed report.
    ///
    /// Fails once the watcher has stopped: the trip was deleted or the actor
    /// is no longer a participant.
    pub async fn changed(&mut self) -> ResultEngine<BalanceReport> {
        self.rx.changed().await.map_err(|_| {
            EngineError::StoreUnavailable(format!("balance watcher of trip {} stopped", self.trip_id))
        })?;
        Ok(self.rx.borrow_and_update().clone())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for BalanceWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
