use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use nook_core::recurrence::RecurrenceGenerator;
use nook_core::remote::RemoteStore;
use nook_core::subscription::{
    MonitorConfig, PollingSource, SubscriptionEvent, SubscriptionManager, SubscriptionMonitor,
};
use nook_core::visibility::VisibilityTracker;
use nook_core::SyncEngine;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::commands::common::{build_engine, build_remote, open_local};
use crate::config::CliConfig;
use crate::error::CliError;

const TASKS_COLLECTION: &str = "tasks";

pub async fn run_watch(
    config: &CliConfig,
    interval_override: Option<u64>,
    live: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let interval = match interval_override {
        Some(0) => return Err(CliError::Config("interval must be greater than zero".into())),
        Some(secs) => Duration::from_secs(secs),
        None => config.sync_interval(),
    };

    let remote = build_remote(config)?;
    let local = open_local(db_path).await?;
    let engine = Arc::new(build_engine(config, local.clone(), Arc::clone(&remote)));
    let generator = RecurrenceGenerator::new(Arc::new(local), TASKS_COLLECTION);

    let manager = SubscriptionManager::new(SubscriptionMonitor::new(
        MonitorConfig::default(),
        Arc::new(VisibilityTracker::new()),
    ));
    if live {
        start_live_updates(config, &manager, &engine, &remote).await;
    }

    println!(
        "Watching {} every {}s (Ctrl-C to stop)",
        engine.collections().join(", "),
        interval.as_secs()
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = ticker.tick() => run_cycle(&engine, &generator).await,
        }
    }

    manager.unregister_all().await;
    println!("Stopped");
    Ok(())
}

/// One scheduler tick: full sync, then recurring instances for today.
async fn run_cycle(engine: &SyncEngine, generator: &RecurrenceGenerator) {
    tracing::debug!("Sync scheduler tick");
    let result = engine.full_sync().await;
    if !result.success() {
        tracing::warn!(
            "Sync failed, will retry next cycle: {}",
            result.error().unwrap_or("unknown error")
        );
        return;
    }
    tracing::info!("Sync completed");

    let today = chrono::Local::now().date_naive();
    match generator.generate_for_stored_tasks(today).await {
        Ok(created) if !created.is_empty() => {
            tracing::info!(count = created.len(), "Created recurring instances; pushing next cycle");
        }
        Ok(_) => {}
        Err(error) => tracing::error!("Recurring generation failed: {}", error),
    }
}

async fn start_live_updates(
    config: &CliConfig,
    manager: &SubscriptionManager,
    engine: &Arc<SyncEngine>,
    remote: &Arc<dyn RemoteStore>,
) {
    let Some(principal) = config.principal.as_deref() else {
        tracing::warn!("No principal configured; live updates disabled");
        return;
    };

    for collection in engine.collections() {
        let source = PollingSource::new(
            Arc::clone(remote),
            principal,
            collection.as_str(),
            config.live_poll_interval(),
        );
        let events = manager.register(collection.as_str(), source).await;
        tokio::spawn(apply_live_events(
            Arc::clone(engine),
            collection.clone(),
            events,
        ));
    }
}

async fn apply_live_events(
    engine: Arc<SyncEngine>,
    collection: String,
    mut events: mpsc::UnboundedReceiver<SubscriptionEvent<Vec<nook_core::Record>>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            SubscriptionEvent::Snapshot(records) => {
                match engine.apply_remote_snapshot(&collection, records).await {
                    Ok(report) if report.applied > 0 => tracing::info!(
                        collection = %collection,
                        applied = report.applied,
                        conflicts = report.conflicts.len(),
                        "Applied live changes"
                    ),
                    Ok(_) => {}
                    Err(error) => {
                        tracing::error!(collection = %collection, "Failed to apply live changes: {}", error);
                    }
                }
            }
            SubscriptionEvent::Reconnected { attempts } => {
                tracing::info!(collection = %collection, attempts, "Live updates resumed");
            }
            SubscriptionEvent::Exhausted { attempts } => {
                tracing::warn!(
                    collection = %collection,
                    attempts,
                    "Live updates stopped; periodic sync continues"
                );
            }
        }
    }
}
