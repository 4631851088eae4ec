//! Snapshot source that re-reads a remote collection on an interval

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::SnapshotSource;
use crate::error::Result;
use crate::models::Record;
use crate::remote::RemoteStore;
use crate::sync::record_from_remote;

/// Polls one remote collection and delivers every successful read.
///
/// Each read counts as a heartbeat, so a healthy poller never goes stale.
/// Read failures are reported on the feed and polling continues.
#[derive(Clone)]
pub struct PollingSource {
    remote: Arc<dyn RemoteStore>,
    principal: String,
    collection: String,
    interval: Duration,
}

impl PollingSource {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        principal: impl Into<String>,
        collection: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            remote,
            principal: principal.into(),
            collection: collection.into(),
            interval,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl SnapshotSource for PollingSource {
    type Snapshot = Vec<Record>;

    fn subscribe(&self) -> mpsc::Receiver<Result<Vec<Record>>> {
        let (tx, rx) = mpsc::channel(1);
        let source = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(source.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = tx.closed() => break,
                    _ = ticker.tick() => {}
                }

                let read = source
                    .remote
                    .read_collection(&source.principal, &source.collection)
                    .await
                    .map(|documents| documents.into_iter().map(record_from_remote).collect());
                if tx.send(read).await.is_err() {
                    break;
                }
            }
            tracing::debug!(collection = %source.collection, "Polling stopped");
        });

        rx
    }
}
