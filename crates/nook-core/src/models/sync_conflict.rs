//! Sync conflict model

use serde::{Deserialize, Serialize};

/// Strategy name recorded for conflicts settled by comparing `updated_at`.
pub const LAST_WRITE_WINS: &str = "last_write_wins";

/// Conflict resolved while merging a remote snapshot into the local cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Collection the record lives in
    pub collection: String,
    /// Record involved in the conflict
    pub record_id: String,
    /// Local copy's timestamp, which was kept
    pub local_updated_at: i64,
    /// Incoming remote timestamp that was rejected
    pub incoming_updated_at: i64,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
    /// Resolution strategy name
    pub strategy: String,
}
