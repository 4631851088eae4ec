//! Keyed registry of monitored subscriptions

use std::collections::HashMap;

use tokio::sync::{mpsc, Mutex};

use super::{
    SnapshotSource, SubscriptionEvent, SubscriptionHandle, SubscriptionHealth, SubscriptionMonitor,
};

/// At most one live subscription per key.
pub struct SubscriptionManager {
    monitor: SubscriptionMonitor,
    handles: Mutex<HashMap<String, SubscriptionHandle>>,
}

impl SubscriptionManager {
    pub fn new(monitor: SubscriptionMonitor) -> Self {
        Self {
            monitor,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Install a subscription under `key`, tearing down any existing one first.
    pub async fn register<S: SnapshotSource>(
        &self,
        key: impl Into<String>,
        source: S,
    ) -> mpsc::UnboundedReceiver<SubscriptionEvent<S::Snapshot>> {
        let key = key.into();
        let mut handles = self.handles.lock().await;
        if let Some(previous) = handles.remove(&key) {
            tracing::debug!(key = %key, "Replacing existing subscription");
            previous.unsubscribe().await;
        }

        let (handle, events) = self.monitor.subscribe(key.clone(), source);
        handles.insert(key, handle);
        events
    }

    /// Tear down the subscription under `key`. Returns whether one existed.
    pub async fn unregister(&self, key: &str) -> bool {
        let previous = self.handles.lock().await.remove(key);
        match previous {
            Some(handle) => {
                handle.unsubscribe().await;
                true
            }
            None => false,
        }
    }

    pub async fn unregister_all(&self) {
        let drained = self.handles.lock().await.drain().collect::<Vec<_>>();
        for (_, handle) in drained {
            handle.unsubscribe().await;
        }
    }

    pub async fn health(&self, key: &str) -> Option<SubscriptionHealth> {
        self.handles
            .lock()
            .await
            .get(key)
            .map(SubscriptionHandle::health)
    }

    /// Registered keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys = self.handles.lock().await.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }
}
