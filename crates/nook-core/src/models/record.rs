//! Record model

use serde::{Deserialize, Serialize};

use super::{Document, FieldValue};

/// Document key carrying the record id.
pub const ID_FIELD: &str = "id";
/// Document key carrying the mutation timestamp.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Any domain entity synchronized between the local cache and the remote store.
///
/// Sync only reasons about `id` and `updated_at`; everything else is an
/// opaque payload in `fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identifier, immutable after creation
    pub id: String,
    /// Last mutation timestamp (Unix ms)
    pub updated_at: i64,
    /// Domain payload, without the `id`/`updatedAt` keys
    pub fields: Document,
}

impl Record {
    /// Create an empty record
    pub fn new(id: impl Into<String>, updated_at: i64) -> Self {
        Self {
            id: id.into(),
            updated_at,
            fields: Document::new(),
        }
    }

    /// Set a payload field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a payload field
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Flatten into a wire document carrying `id` and `updatedAt` as fields.
    pub fn to_document(&self) -> Document {
        let mut document = self.fields.clone();
        document.insert(ID_FIELD.to_string(), FieldValue::String(self.id.clone()));
        document.insert(
            UPDATED_AT_FIELD.to_string(),
            FieldValue::Integer(self.updated_at),
        );
        document
    }

    /// Rebuild a record from a wire document.
    ///
    /// The document id wins over any `id` field inside the payload. A missing
    /// or non-numeric `updatedAt` reads as 0 so it loses every LWW comparison.
    pub fn from_document(id: impl Into<String>, mut document: Document) -> Self {
        document.remove(ID_FIELD);
        let updated_at = document
            .remove(UPDATED_AT_FIELD)
            .and_then(|value| value.as_integer())
            .unwrap_or(0);

        Self {
            id: id.into(),
            updated_at,
            fields: document,
        }
    }
}
