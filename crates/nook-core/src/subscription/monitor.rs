//! Per-subscription health monitor task

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{
    MonitorConfig, SnapshotSource, SubscriptionEvent, SubscriptionHealth, SubscriptionState,
};
use crate::error::{Error, Result};
use crate::visibility::{VisibilityChange, VisibilityTracker};

type SharedHealth = Arc<Mutex<SubscriptionHealth>>;

fn lock_health(health: &SharedHealth) -> MutexGuard<'_, SubscriptionHealth> {
    health.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spawns one monitoring task per subscription
#[derive(Debug, Clone)]
pub struct SubscriptionMonitor {
    config: MonitorConfig,
    visibility: Arc<VisibilityTracker>,
}

impl SubscriptionMonitor {
    pub const fn new(config: MonitorConfig, visibility: Arc<VisibilityTracker>) -> Self {
        Self { config, visibility }
    }

    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start monitoring `source` under `id`.
    ///
    /// Must be called inside a tokio runtime. Events arrive on the returned
    /// receiver until the handle is dropped or the subscription is exhausted.
    pub fn subscribe<S: SnapshotSource>(
        &self,
        id: impl Into<String>,
        source: S,
    ) -> (
        SubscriptionHandle,
        mpsc::UnboundedReceiver<SubscriptionEvent<S::Snapshot>>,
    ) {
        let id = id.into();
        let health = Arc::new(Mutex::new(SubscriptionHealth::new(id.clone())));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = MonitorTask {
            id: id.clone(),
            source,
            config: self.config,
            health: Arc::clone(&health),
            events: events_tx,
            visibility: Some(self.visibility.watch()),
        };
        tracing::debug!(subscription = %id, "Subscription registered");
        let join = tokio::spawn(task.run(shutdown_rx));

        let handle = SubscriptionHandle {
            id,
            health,
            shutdown: Some(shutdown_tx),
            task: Some(join),
        };
        (handle, events_rx)
    }
}

/// Owner of a running subscription. Dropping it tears the subscription down.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: String,
    health: SharedHealth,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the current health record
    pub fn health(&self) -> SubscriptionHealth {
        lock_health(&self.health).clone()
    }

    /// Whether the monitoring task has stopped (exhausted or torn down)
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the task and wait until its feed has been dropped
    pub async fn unsubscribe(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!(subscription = %self.id, "Monitor task ended abnormally: {}", error);
            }
        }
        tracing::debug!(subscription = %self.id, "Subscription removed");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }
    }
}

struct MonitorTask<S: SnapshotSource> {
    id: String,
    source: S,
    config: MonitorConfig,
    health: SharedHealth,
    events: mpsc::UnboundedSender<SubscriptionEvent<S::Snapshot>>,
    /// `None` once the tracker is gone; the host then counts as foregrounded
    visibility: Option<watch::Receiver<VisibilityChange>>,
}

impl<S: SnapshotSource> MonitorTask<S> {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut feed = Some(self.source.subscribe());
        let period = self.config.health_check_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                delivery = next_delivery(&mut feed) => match delivery {
                    Some(Ok(snapshot)) => self.on_snapshot(snapshot),
                    Some(Err(error)) => self.on_feed_error(&error),
                    None => {
                        feed = None;
                        self.on_feed_error(&Error::Remote("subscription feed closed".to_string()));
                    }
                },
                _ = ticker.tick() => {
                    if self.is_stale() && !self.reconnect(&mut feed, "stale") {
                        break;
                    }
                }
                change = next_visibility(&mut self.visibility) => match change {
                    Some(change) => {
                        let returned_after_threshold = !change.is_background
                            && change
                                .background_duration
                                .is_some_and(|duration| duration > self.config.stale_threshold);
                        if returned_after_threshold && !self.reconnect(&mut feed, "foreground") {
                            break;
                        }
                    }
                    None => self.visibility = None,
                },
            }
        }
        tracing::debug!(subscription = %self.id, "Monitor stopped");
    }

    fn on_snapshot(&self, snapshot: S::Snapshot) {
        let reconnected_after = {
            let mut health = lock_health(&self.health);
            let reconnected_after = (health.state == SubscriptionState::Reconnecting)
                .then_some(health.reconnect_attempts);
            health.last_update_at = Instant::now();
            health.update_count += 1;
            health.is_healthy = true;
            health.reconnect_attempts = 0;
            health.state = SubscriptionState::Healthy;
            reconnected_after
        };

        if let Some(attempts) = reconnected_after {
            tracing::info!(subscription = %self.id, attempts, "Subscription reconnected");
            self.events
                .send(SubscriptionEvent::Reconnected { attempts })
                .ok();
        }
        self.events.send(SubscriptionEvent::Snapshot(snapshot)).ok();
    }

    fn on_feed_error(&self, error: &Error) {
        tracing::warn!(subscription = %self.id, "Subscription feed error: {}", error);
        lock_health(&self.health).is_healthy = false;
    }

    fn is_background(&self) -> bool {
        self.visibility
            .as_ref()
            .is_some_and(|visibility| visibility.borrow().is_background)
    }

    fn is_stale(&self) -> bool {
        if self.is_background() {
            return false;
        }
        let mut health = lock_health(&self.health);
        if health.state == SubscriptionState::Exhausted
            || health.since_last_update() <= self.config.stale_threshold
        {
            return false;
        }
        if health.state != SubscriptionState::Reconnecting {
            health.state = SubscriptionState::Stale;
        }
        true
    }

    /// Drop the current feed and open a new one.
    ///
    /// Returns `false` once attempts are used up and the task should stop.
    fn reconnect(
        &self,
        feed: &mut Option<mpsc::Receiver<Result<S::Snapshot>>>,
        reason: &str,
    ) -> bool {
        let attempts = {
            let mut health = lock_health(&self.health);
            health.is_healthy = false;
            if health.reconnect_attempts >= self.config.max_reconnect_attempts {
                health.state = SubscriptionState::Exhausted;
                let attempts = health.reconnect_attempts;
                drop(health);

                tracing::error!(
                    subscription = %self.id,
                    attempts,
                    "Giving up on subscription after repeated reconnects"
                );
                self.events
                    .send(SubscriptionEvent::Exhausted { attempts })
                    .ok();
                return false;
            }
            health.reconnect_attempts += 1;
            health.state = SubscriptionState::Reconnecting;
            health.reconnect_attempts
        };

        tracing::warn!(
            subscription = %self.id,
            attempt = attempts,
            max = self.config.max_reconnect_attempts,
            reason,
            "Reconnecting subscription"
        );
        *feed = None;
        *feed = Some(self.source.subscribe());
        true
    }
}

async fn next_delivery<T>(feed: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match feed {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// Next visibility change, or `None` once the tracker has been dropped
async fn next_visibility(
    visibility: &mut Option<watch::Receiver<VisibilityChange>>,
) -> Option<VisibilityChange> {
    match visibility {
        Some(receiver) => match receiver.changed().await {
            Ok(()) => Some(*receiver.borrow_and_update()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}
