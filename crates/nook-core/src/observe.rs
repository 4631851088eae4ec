//! Request log used to inspect sync health independently of results.
//!
//! Purely informational: nothing in the crate reads it back for control flow.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

const DEFAULT_CAPACITY: usize = 200;

/// Handle returned by [`RequestLog::begin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Success,
    Error,
}

/// How a traced request finished
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOutcome {
    pub status: RequestStatus,
    pub payload: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl RequestOutcome {
    pub const fn success(payload: Option<serde_json::Value>) -> Self {
        Self {
            status: RequestStatus::Success,
            payload,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: RequestStatus::Error,
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// One traced request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestEntry {
    pub id: RequestId,
    /// Request family, e.g. `sync`
    pub kind: String,
    /// Operation name, e.g. `push`
    pub method: String,
    /// What the request acted on
    pub target: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub status: RequestStatus,
    pub payload: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Bounded in-memory queue of traced requests, mirrored to `tracing`.
///
/// The oldest entry is evicted once `capacity` is reached.
#[derive(Debug)]
pub struct RequestLog {
    entries: Mutex<VecDeque<RequestEntry>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Record the start of a request
    pub fn begin(&self, kind: &str, method: &str, target: &str) -> RequestId {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(kind, method, target, "Request started");

        let entry = RequestEntry {
            id,
            kind: kind.to_string(),
            method: method.to_string(),
            target: target.to_string(),
            started_at: crate::util::now_millis(),
            finished_at: None,
            status: RequestStatus::Pending,
            payload: None,
            error: None,
        };

        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        id
    }

    /// Close a request. Unknown or already evicted ids are ignored.
    pub fn end(&self, id: RequestId, outcome: RequestOutcome) {
        let mut entries = self.lock();
        let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) else {
            return;
        };

        match outcome.status {
            RequestStatus::Error => tracing::warn!(
                method = %entry.method,
                target = %entry.target,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "Request failed"
            ),
            _ => tracing::debug!(
                method = %entry.method,
                target = %entry.target,
                "Request succeeded"
            ),
        }

        entry.finished_at = Some(crate::util::now_millis());
        entry.status = outcome.status;
        entry.payload = outcome.payload;
        entry.error = outcome.error;
    }

    /// Snapshot of the queue, oldest first
    pub fn entries(&self) -> Vec<RequestEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<RequestEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
