//! Bidirectional sync between the local cache and the remote store.

mod engine;

pub use engine::{MergeReport, SyncEngine};

use crate::models::Record;
use crate::remote::RemoteDocument;

/// Remote-only field stamped on every pushed document
pub const SYNC_TIMESTAMP_FIELD: &str = "syncedAt";

/// Collections tracked when nothing else is configured
pub const DEFAULT_COLLECTIONS: [&str; 6] = [
    "tasks",
    "thoughts",
    "moods",
    "focusSessions",
    "trips",
    "spending",
];

/// Which collections the engine keeps in sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub collections: Vec<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            collections: DEFAULT_COLLECTIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl SyncSettings {
    /// Track exactly `collections`; blank and duplicate names are skipped.
    #[must_use]
    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections.clear();
        for collection in collections {
            let collection = collection.into().trim().to_string();
            if !collection.is_empty() && !self.collections.contains(&collection) {
                self.collections.push(collection);
            }
        }
        self
    }
}

/// Convert a remote document into a local record, dropping sync bookkeeping.
pub fn record_from_remote(document: RemoteDocument) -> Record {
    let RemoteDocument { id, mut fields } = document;
    fields.remove(SYNC_TIMESTAMP_FIELD);
    Record::from_document(id, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, FieldValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn default_settings_track_every_domain_collection() {
        let settings = SyncSettings::default();
        assert_eq!(settings.collections.len(), 6);
        assert!(settings.collections.iter().any(|name| name == "focusSessions"));
    }

    #[test]
    fn with_collections_skips_blank_and_duplicate_names() {
        let settings = SyncSettings::default().with_collections(["tasks", " ", "moods", "tasks"]);
        assert_eq!(settings.collections, vec!["tasks", "moods"]);
    }

    #[test]
    fn record_from_remote_strips_sync_timestamp() {
        let mut fields = Document::new();
        fields.insert("title".to_string(), FieldValue::from("x"));
        fields.insert("updatedAt".to_string(), FieldValue::Integer(7));
        fields.insert(SYNC_TIMESTAMP_FIELD.to_string(), FieldValue::Integer(9));

        let record = record_from_remote(RemoteDocument {
            id: "r1".to_string(),
            fields,
        });

        assert_eq!(record, Record::new("r1", 7).with_field("title", "x"));
    }
}
