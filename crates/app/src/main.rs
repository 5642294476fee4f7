use std::sync::Arc;

use engine::{BalanceWatcher, Engine, MemoryStore, SqliteStore, Store, UserId};
use migration::{Migrator, MigratorTrait};

mod demo;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tripshare={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let store = open_store(&settings.store).await?;
    let engine = Engine::builder()
        .store(store)
        .settings(settings.ledger.clone())
        .build()
        .await?;

    if settings.seed_demo {
        demo::seed(&engine).await?;
    }

    let watch_user = settings
        .watch_user
        .clone()
        .or_else(|| settings.seed_demo.then(|| demo::DEMO_OWNER.to_string()));
    let Some(watch_user) = watch_user.map(UserId::new) else {
        tracing::info!("no watch_user configured, nothing to watch");
        return Ok(());
    };

    let mut tasks = tokio::task::JoinSet::new();
    for trip in engine.trips_for(&watch_user).await?.active {
        let mut watcher = match BalanceWatcher::spawn(engine.clone(), trip.id, &watch_user).await {
            Ok(watcher) => watcher,
            Err(err) => {
                tracing::error!(trip_id = %trip.id, "failed to watch trip: {err}");
                continue;
            }
        };
        log_report(&trip.name, &watcher.current());
        tasks.spawn(async move {
            while let Ok(report) = watcher.changed().await {
                log_report(&trip.name, &report);
            }
        });
    }

    tracing::info!(watchers = tasks.len(), "watching balances, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    tasks.shutdown().await;
    Ok(())
}

async fn open_store(
    config: &settings::Store,
) -> Result<Arc<dyn Store>, Box<dyn std::error::Error + Send + Sync>> {
    match config {
        settings::Store::Memory => Ok(Arc::new(MemoryStore::new())),
        settings::Store::Sqlite(path) => {
            let database = sea_orm::Database::connect(format!("sqlite:{path}?mode=rwc")).await?;
            Migrator::up(&database, None).await?;
            Ok(Arc::new(SqliteStore::new(database)))
        }
    }
}

fn log_report(trip_name: &str, report: &engine::BalanceReport) {
    tracing::info!(
        trip = trip_name,
        paid = %report.total_paid,
        pending = %report.total_pending,
        "balances"
    );
    for (user_id, person) in &report.people {
        tracing::info!(
            trip = trip_name,
            %user_id,
            balance = %person.balance,
            standing = ?person.standing(report.settle_tolerance),
            "balance"
        );
    }
}
