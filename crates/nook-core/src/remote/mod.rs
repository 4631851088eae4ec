//! Remote document store shared by every device of a principal.
//!
//! Documents are addressed by `(collection, id)` under the principal's root
//! (`users/{principal}/{collection}/{id}`). Writes go through whole-document
//! overwrites, never partial field patches.

mod firestore;
mod memory;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{Document, FieldValue};

pub use firestore::FirestoreRemote;
pub use memory::MemoryRemoteStore;

/// One mutation inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchWrite {
    /// Overwrite (or create) the whole document
    Set {
        collection: String,
        id: String,
        document: Document,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl BatchWrite {
    pub fn collection(&self) -> &str {
        match self {
            Self::Set { collection, .. } | Self::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Set { id, .. } | Self::Delete { id, .. } => id,
        }
    }
}

/// A document as read back from the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub id: String,
    pub fields: Document,
}

/// Operations the sync layer consumes from the remote store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Apply every write or none of them
    async fn commit(&self, principal: &str, writes: Vec<BatchWrite>) -> Result<()>;

    /// Every document in a collection
    async fn read_collection(&self, principal: &str, collection: &str)
        -> Result<Vec<RemoteDocument>>;

    async fn get(&self, principal: &str, collection: &str, id: &str)
        -> Result<Option<Document>>;

    /// Overwrite a single document
    async fn set(&self, principal: &str, collection: &str, id: &str, document: Document)
        -> Result<()>;

    /// Delete a single document. Missing documents are not an error.
    async fn delete(&self, principal: &str, collection: &str, id: &str) -> Result<()>;
}

/// Relative path of a collection under the principal's root
pub fn collection_path(principal: &str, collection: &str) -> String {
    format!("users/{principal}/{collection}")
}

/// Relative path of a document under the principal's root
pub fn document_path(principal: &str, collection: &str, id: &str) -> String {
    format!("{}/{id}", collection_path(principal, collection))
}

/// Reject documents still carrying [`FieldValue::Missing`] at any depth.
///
/// Mirrors the wire format's refusal of unset values; sanitized documents
/// always pass.
pub fn ensure_representable(document: &Document) -> Result<()> {
    fn check(path: &str, value: &FieldValue) -> Result<()> {
        match value {
            FieldValue::Missing => Err(Error::Unrepresentable(format!(
                "field '{path}' has no value"
            ))),
            FieldValue::Array(values) => values
                .iter()
                .enumerate()
                .try_for_each(|(index, value)| check(&format!("{path}[{index}]"), value)),
            FieldValue::Map(entries) => entries
                .iter()
                .try_for_each(|(key, value)| check(&format!("{path}.{key}"), value)),
            _ => Ok(()),
        }
    }

    document.iter().try_for_each(|(key, value)| check(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_path_nests_under_principal() {
        assert_eq!(
            document_path("u1", "tasks", "t1"),
            "users/u1/tasks/t1".to_string()
        );
    }

    #[test]
    fn ensure_representable_reports_nested_path() {
        let mut inner = Document::new();
        inner.insert("when".to_string(), FieldValue::Missing);
        let mut document = Document::new();
        document.insert(
            "items".to_string(),
            FieldValue::Array(vec![FieldValue::Map(inner)]),
        );

        let error = ensure_representable(&document).unwrap_err();
        assert!(error.to_string().contains("items[0].when"));
    }

    #[test]
    fn ensure_representable_accepts_nulls() {
        let mut document = Document::new();
        document.insert("cleared".to_string(), FieldValue::Null);
        assert!(ensure_representable(&document).is_ok());
    }
}
