//! Hand-driven snapshot source for monitor tests

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use super::SnapshotSource;
use crate::error::{Error, Result};

type Feeds = Vec<mpsc::Sender<Result<i32>>>;

/// Records every feed it opens so tests can push into the newest one.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    feeds: Arc<Mutex<Feeds>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn feeds(&self) -> MutexGuard<'_, Feeds> {
        self.feeds.lock().unwrap()
    }

    fn latest(&self) -> mpsc::Sender<Result<i32>> {
        self.feeds().last().cloned().expect("no feed opened yet")
    }

    pub async fn deliver(&self, value: i32) {
        self.latest().send(Ok(value)).await.ok();
    }

    pub async fn fail(&self, message: &str) {
        self.latest()
            .send(Err(Error::Remote(message.to_string())))
            .await
            .ok();
    }

    /// How many times `subscribe` was called
    pub fn subscriptions(&self) -> usize {
        self.feeds().len()
    }

    pub fn latest_feed_closed(&self) -> bool {
        self.feeds().last().is_some_and(mpsc::Sender::is_closed)
    }

    pub fn previous_feed_closed(&self) -> bool {
        let feeds = self.feeds();
        feeds.len() >= 2 && feeds[feeds.len() - 2].is_closed()
    }

    pub fn all_feeds_closed(&self) -> bool {
        self.feeds().iter().all(mpsc::Sender::is_closed)
    }
}

impl SnapshotSource for ScriptedSource {
    type Snapshot = i32;

    fn subscribe(&self) -> mpsc::Receiver<Result<i32>> {
        let (tx, rx) = mpsc::channel(8);
        self.feeds().push(tx);
        rx
    }
}
