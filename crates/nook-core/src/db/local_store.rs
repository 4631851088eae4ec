//! Local record cache addressed by collection name

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::Connection;
use tokio::sync::Mutex;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{Document, Record};
use crate::sanitize::sanitize_document;

/// Storage operations the sync layer needs from the local cache
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Every record in `collection`, ordered by id
    async fn read_all(&self, collection: &str) -> Result<Vec<Record>>;

    /// Remove every record in `collection`
    async fn clear(&self, collection: &str) -> Result<()>;

    /// Insert records, replacing existing ones with the same id
    async fn bulk_insert(&self, collection: &str, records: &[Record]) -> Result<()>;

    /// Replace the whole collection with `records`
    async fn replace_all(&self, collection: &str, records: &[Record]) -> Result<()> {
        self.clear(collection).await?;
        self.bulk_insert(collection, records).await
    }

    /// Remove a single record. Missing records are not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// libSQL implementation of [`LocalStore`]
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct LibSqlLocalStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlLocalStore {
    pub const fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Open a store at the given filesystem path, creating parent directories.
    pub async fn open_path(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(db_path).await?;
        Ok(Self::new(Arc::new(Mutex::new(db))))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::new(Arc::new(Mutex::new(db))))
    }

    /// Per-collection record counts, for status output
    pub async fn counts(&self) -> Result<Vec<(String, usize)>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT collection, COUNT(*) FROM records GROUP BY collection ORDER BY collection",
                (),
            )
            .await?;

        let mut counts = Vec::new();
        while let Some(row) = rows.next().await? {
            let collection: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            counts.push((collection, usize::try_from(count).unwrap_or_default()));
        }
        Ok(counts)
    }

    async fn insert_rows(conn: &Connection, collection: &str, records: &[Record]) -> Result<()> {
        for record in records {
            let data = serde_json::to_string(&sanitize_document(record.fields.clone()))?;
            conn.execute(
                "INSERT OR REPLACE INTO records (collection, id, updated_at, data) VALUES (?, ?, ?, ?)",
                libsql::params![collection, record.id.as_str(), record.updated_at, data],
            )
            .await?;
        }
        Ok(())
    }

    /// Write `records` in one transaction, optionally clearing the collection
    /// first. Rolls back on failure.
    async fn in_transaction(
        conn: &Connection,
        collection: &str,
        records: &[Record],
        clear_first: bool,
    ) -> Result<()> {
        conn.execute("BEGIN TRANSACTION", ()).await?;

        let outcome: Result<()> = async {
            if clear_first {
                conn.execute("DELETE FROM records WHERE collection = ?", [collection])
                    .await?;
            }
            Self::insert_rows(conn, collection, records).await
        }
        .await;

        if let Err(error) = outcome {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(error);
        }

        if let Err(error) = conn.execute("COMMIT", ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(error.into());
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for LibSqlLocalStore {
    async fn read_all(&self, collection: &str) -> Result<Vec<Record>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT id, updated_at, data FROM records WHERE collection = ? ORDER BY id",
                [collection],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            let updated_at: i64 = row.get(1)?;
            let data: String = row.get(2)?;
            let fields = serde_json::from_str::<Document>(&data).map_err(|error| {
                Error::Database(format!("corrupt payload for {collection}/{id}: {error}"))
            })?;
            records.push(Record {
                id,
                updated_at,
                fields,
            });
        }
        Ok(records)
    }

    async fn clear(&self, collection: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM records WHERE collection = ?", [collection])
            .await?;
        Ok(())
    }

    async fn bulk_insert(&self, collection: &str, records: &[Record]) -> Result<()> {
        let db = self.db.lock().await;
        Self::in_transaction(db.connection(), collection, records, false).await
    }

    async fn replace_all(&self, collection: &str, records: &[Record]) -> Result<()> {
        let db = self.db.lock().await;
        Self::in_transaction(db.connection(), collection, records, true).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "DELETE FROM records WHERE collection = ? AND id = ?",
                [collection, id],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use pretty_assertions::assert_eq;

    async fn setup() -> LibSqlLocalStore {
        LibSqlLocalStore::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bulk_insert_then_read_all() {
        let store = setup().await;
        let records = vec![
            Record::new("b", 2).with_field("mood", "calm"),
            Record::new("a", 1).with_field("mood", "tired"),
        ];

        store.bulk_insert("moods", &records).await.unwrap();

        let loaded = store.read_all("moods").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a");
        assert_eq!(loaded[1].get("mood"), Some(&FieldValue::from("calm")));
        assert!(store.read_all("thoughts").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bulk_insert_overwrites_same_id() {
        let store = setup().await;
        store
            .bulk_insert("tasks", &[Record::new("t1", 1).with_field("done", false)])
            .await
            .unwrap();
        store
            .bulk_insert("tasks", &[Record::new("t1", 5).with_field("done", true)])
            .await
            .unwrap();

        let loaded = store.read_all("tasks").await.unwrap();
        assert_eq!(loaded, vec![Record::new("t1", 5).with_field("done", true)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_fields_are_not_persisted() {
        let store = setup().await;
        let record = Record::new("t1", 1)
            .with_field("title", "x")
            .with_field("category", FieldValue::Missing);

        store.bulk_insert("tasks", &[record]).await.unwrap();

        let loaded = store.read_all("tasks").await.unwrap();
        assert_eq!(loaded[0].get("category"), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn replace_all_only_touches_one_collection() {
        let store = setup().await;
        store
            .bulk_insert("tasks", &[Record::new("old", 1)])
            .await
            .unwrap();
        store
            .bulk_insert("moods", &[Record::new("m", 1)])
            .await
            .unwrap();

        store
            .replace_all("tasks", &[Record::new("new", 2)])
            .await
            .unwrap();

        let tasks = store.read_all("tasks").await.unwrap();
        assert_eq!(tasks, vec![Record::new("new", 2)]);
        assert_eq!(store.read_all("moods").await.unwrap().len(), 1);
        assert_eq!(
            store.counts().await.unwrap(),
            vec![("moods".to_string(), 1), ("tasks".to_string(), 1)]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_removes_single_record() {
        let store = setup().await;
        store
            .bulk_insert("tasks", &[Record::new("a", 1), Record::new("b", 1)])
            .await
            .unwrap();

        store.delete("tasks", "a").await.unwrap();
        store.delete("tasks", "does-not-exist").await.unwrap();

        let ids = store
            .read_all("tasks")
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["b"]);
    }
}
