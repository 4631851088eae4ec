//! Outcome of a sync operation

use serde::{Deserialize, Serialize};

/// Complete outcome of one push, pull or full sync.
///
/// Only constructible as a success or a failure, so callers never observe a
/// half-built result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    success: bool,
    timestamp: i64,
    error: Option<String>,
}

impl SyncResult {
    pub const fn succeeded(timestamp: i64) -> Self {
        Self {
            success: true,
            timestamp,
            error: None,
        }
    }

    pub fn failed(timestamp: i64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            timestamp,
            error: Some(error.into()),
        }
    }

    pub const fn success(&self) -> bool {
        self.success
    }

    /// When the operation finished (Unix ms)
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_carries_message() {
        let result = SyncResult::failed(10, "User not authenticated");
        assert!(!result.success());
        assert_eq!(result.timestamp(), 10);
        assert_eq!(result.error(), Some("User not authenticated"));
    }

    #[test]
    fn succeeded_result_has_no_error() {
        let result = SyncResult::succeeded(11);
        assert!(result.success());
        assert_eq!(result.error(), None);
    }
}
