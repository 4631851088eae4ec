//! Foreground/background visibility collaborator.
//!
//! The host (window, tab, app lifecycle hook) reports transitions with
//! [`VisibilityTracker::set_background`]; subscription monitors watch them.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Latest visibility transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityChange {
    pub is_background: bool,
    /// How long the host stayed in the background; set on return to foreground
    pub background_duration: Option<Duration>,
}

#[derive(Debug)]
pub struct VisibilityTracker {
    tx: watch::Sender<VisibilityChange>,
    backgrounded_at: Mutex<Option<Instant>>,
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityTracker {
    /// A tracker that starts in the foreground
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(VisibilityChange {
            is_background: false,
            background_duration: None,
        });
        Self {
            tx,
            backgrounded_at: Mutex::new(None),
        }
    }

    pub fn is_background(&self) -> bool {
        self.tx.borrow().is_background
    }

    /// Report a visibility transition. Repeating the current state is a no-op.
    pub fn set_background(&self, is_background: bool) {
        if self.is_background() == is_background {
            return;
        }

        let mut backgrounded_at = self
            .backgrounded_at
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let change = if is_background {
            *backgrounded_at = Some(Instant::now());
            VisibilityChange {
                is_background: true,
                background_duration: None,
            }
        } else {
            VisibilityChange {
                is_background: false,
                background_duration: backgrounded_at.take().map(|since| since.elapsed()),
            }
        };

        tracing::debug!(
            is_background,
            background_duration = ?change.background_duration,
            "Visibility changed"
        );
        self.tx.send_replace(change);
    }

    /// Receiver that observes every subsequent transition
    pub fn watch(&self) -> watch::Receiver<VisibilityChange> {
        self.tx.subscribe()
    }
}
