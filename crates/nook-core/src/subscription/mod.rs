//! Live query subscriptions with heartbeat tracking and bounded reconnection.
//!
//! A [`SnapshotSource`] is a restartable feed of snapshots. The
//! [`SubscriptionMonitor`] wraps one feed per subscription, forwards every
//! delivery, and resubscribes when the feed goes quiet for too long while the
//! host is in the foreground.

mod config;
mod manager;
mod monitor;
mod polling;
#[cfg(test)]
mod test_support;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::Result;

pub use config::MonitorConfig;
pub use manager::SubscriptionManager;
pub use monitor::{SubscriptionHandle, SubscriptionMonitor};
pub use polling::PollingSource;

/// Lazy, restartable snapshot feed.
///
/// Each call to [`subscribe`](Self::subscribe) opens a fresh feed. Dropping
/// the receiver tears that feed down.
pub trait SnapshotSource: Send + Sync + 'static {
    type Snapshot: Send + 'static;

    fn subscribe(&self) -> mpsc::Receiver<Result<Self::Snapshot>>;
}

/// Lifecycle of a monitored subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Registered, nothing delivered yet
    Connecting,
    Healthy,
    /// No delivery within the stale threshold while foregrounded
    Stale,
    /// Resubscribed, waiting for the first delivery of the new feed
    Reconnecting,
    /// Out of reconnect attempts; needs to be registered again
    Exhausted,
}

/// Health bookkeeping for one subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHealth {
    pub id: String,
    pub created_at: Instant,
    /// Last delivery, or registration time before the first one
    pub last_update_at: Instant,
    pub update_count: u64,
    pub is_healthy: bool,
    /// Reset to zero by every delivery
    pub reconnect_attempts: u32,
    pub state: SubscriptionState,
}

impl SubscriptionHealth {
    fn new(id: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            id: id.into(),
            created_at: now,
            last_update_at: now,
            update_count: 0,
            is_healthy: true,
            reconnect_attempts: 0,
            state: SubscriptionState::Connecting,
        }
    }

    /// Time since the last delivery
    pub fn since_last_update(&self) -> Duration {
        self.last_update_at.elapsed()
    }
}

/// What a monitored subscription reports to its consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent<S> {
    /// A delivered snapshot, forwarded unfiltered
    Snapshot(S),
    /// First delivery after one or more reconnects
    Reconnected { attempts: u32 },
    /// Reconnect attempts used up; the subscription has stopped
    Exhausted { attempts: u32 },
}
