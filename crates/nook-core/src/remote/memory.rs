//! In-process remote store for tests and offline runs

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ensure_representable, BatchWrite, RemoteDocument, RemoteStore};
use crate::error::{Error, Result};
use crate::models::Document;

type Collections = BTreeMap<(String, String), BTreeMap<String, Document>>;

/// Remote store kept in memory, with switchable network failure.
///
/// Enforces the same all-or-nothing batch semantics and the same refusal of
/// unset values as the real store.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    collections: Mutex<Collections>,
    offline: AtomicBool,
    requests: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following request fail as a network error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests that reached the store, failed or not
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn begin_request(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Remote("network unavailable".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn key(principal: &str, collection: &str) -> (String, String) {
        (principal.to_string(), collection.to_string())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn commit(&self, principal: &str, writes: Vec<BatchWrite>) -> Result<()> {
        self.begin_request()?;

        // Validate everything before touching state so a bad write leaves
        // the store untouched.
        for write in &writes {
            if let BatchWrite::Set { document, .. } = write {
                ensure_representable(document)?;
            }
        }

        let mut collections = self.lock();
        for write in writes {
            match write {
                BatchWrite::Set {
                    collection,
                    id,
                    document,
                } => {
                    collections
                        .entry(Self::key(principal, &collection))
                        .or_default()
                        .insert(id, document);
                }
                BatchWrite::Delete { collection, id } => {
                    if let Some(documents) =
                        collections.get_mut(&Self::key(principal, &collection))
                    {
                        documents.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }

    async fn read_collection(
        &self,
        principal: &str,
        collection: &str,
    ) -> Result<Vec<RemoteDocument>> {
        self.begin_request()?;
        let collections = self.lock();
        Ok(collections
            .get(&Self::key(principal, collection))
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, fields)| RemoteDocument {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, principal: &str, collection: &str, id: &str) -> Result<Option<Document>> {
        self.begin_request()?;
        let collections = self.lock();
        Ok(collections
            .get(&Self::key(principal, collection))
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn set(
        &self,
        principal: &str,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<()> {
        self.commit(
            principal,
            vec![BatchWrite::Set {
                collection: collection.to_string(),
                id: id.to_string(),
                document,
            }],
        )
        .await
    }

    async fn delete(&self, principal: &str, collection: &str, id: &str) -> Result<()> {
        self.commit(
            principal,
            vec![BatchWrite::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            }],
        )
        .await
    }
}
