//! Push, pull and merge operations over the injected stores

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::json;

use super::{record_from_remote, SyncSettings, SYNC_TIMESTAMP_FIELD};
use crate::auth::AuthProvider;
use crate::db::LocalStore;
use crate::error::{Error, Result};
use crate::models::{FieldValue, Record, SyncConflict, SyncResult, LAST_WRITE_WINS};
use crate::observe::{RequestLog, RequestOutcome};
use crate::remote::{BatchWrite, RemoteStore};
use crate::sanitize::sanitize_document;
use crate::util::now_millis;

const REQUEST_KIND: &str = "sync";

/// What a live snapshot merge did to the local collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Incoming records written locally
    pub applied: usize,
    /// Incoming records identical to the local copy
    pub unchanged: usize,
    /// Incoming records rejected because the local copy was newer
    pub conflicts: Vec<SyncConflict>,
}

/// Keeps the local cache and the remote store in agreement.
///
/// Public operations never fail: errors come back as a failed [`SyncResult`].
pub struct SyncEngine {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    auth: Arc<dyn AuthProvider>,
    requests: Arc<RequestLog>,
    settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthProvider>,
        requests: Arc<RequestLog>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            local,
            remote,
            auth,
            requests,
            settings,
        }
    }

    pub fn collections(&self) -> &[String] {
        &self.settings.collections
    }

    /// Upload every tracked local record in one atomic batch.
    ///
    /// Remote documents are overwritten unconditionally.
    pub async fn push(&self) -> SyncResult {
        let target = self.settings.collections.join(",");
        self.traced("push", &target, self.try_push()).await
    }

    /// Replace every tracked local collection with the remote contents.
    ///
    /// Local-only changes are discarded.
    pub async fn pull(&self) -> SyncResult {
        let target = self.settings.collections.join(",");
        self.traced("pull", &target, self.try_pull()).await
    }

    /// Push, then pull if the push succeeded.
    ///
    /// Remote edits made by another device between the two phases are
    /// overwritten by the push.
    pub async fn full_sync(&self) -> SyncResult {
        tracing::debug!("Starting full sync");
        let pushed = self.push().await;
        if !pushed.success() {
            return pushed;
        }
        self.pull().await
    }

    /// Delete a record from the remote store, then from the local cache.
    pub async fn delete_record(&self, collection: &str, id: &str) -> SyncResult {
        let target = format!("{collection}/{id}");
        let operation = async {
            let principal = self.principal()?;
            self.remote.delete(&principal, collection, id).await?;
            self.local.delete(collection, id).await?;
            Ok::<_, Error>(json!({ "deleted": id }))
        };
        self.traced("delete", &target, operation).await
    }

    /// Merge a delivered remote snapshot into the local collection.
    ///
    /// Last write wins on `updated_at`; ties go to the incoming record. Local
    /// records absent from the snapshot are kept.
    pub async fn apply_remote_snapshot(
        &self,
        collection: &str,
        incoming: Vec<Record>,
    ) -> Result<MergeReport> {
        let request = self
            .requests
            .begin(REQUEST_KIND, "apply_snapshot", collection);

        let outcome = self.merge_snapshot(collection, incoming).await;
        match &outcome {
            Ok(report) => {
                if !report.conflicts.is_empty() {
                    tracing::info!(
                        collection,
                        conflicts = report.conflicts.len(),
                        "Kept newer local records over incoming snapshot"
                    );
                }
                self.requests.end(
                    request,
                    RequestOutcome::success(Some(json!({
                        "applied": report.applied,
                        "unchanged": report.unchanged,
                        "conflicts": report.conflicts.len(),
                    }))),
                );
            }
            Err(error) => self
                .requests
                .end(request, RequestOutcome::failure(error.to_string())),
        }
        outcome
    }

    async fn try_push(&self) -> Result<serde_json::Value> {
        let principal = self.principal()?;
        let synced_at = now_millis();

        let mut writes = Vec::new();
        for collection in &self.settings.collections {
            let records = self.local.read_all(collection).await?;
            tracing::debug!(collection = %collection, count = records.len(), "Collected local records");
            for record in records {
                let mut document = sanitize_document(record.to_document());
                document.insert(
                    SYNC_TIMESTAMP_FIELD.to_string(),
                    FieldValue::Integer(synced_at),
                );
                writes.push(BatchWrite::Set {
                    collection: collection.clone(),
                    id: record.id,
                    document,
                });
            }
        }

        let count = writes.len();
        self.remote.commit(&principal, writes).await?;
        tracing::info!(records = count, "Pushed local records");
        Ok(json!({ "records": count }))
    }

    async fn try_pull(&self) -> Result<serde_json::Value> {
        let principal = self.principal()?;

        // Read everything before touching the cache so a failed read leaves
        // every local collection as it was.
        let mut snapshots = Vec::with_capacity(self.settings.collections.len());
        for collection in &self.settings.collections {
            let records = self
                .remote
                .read_collection(&principal, collection)
                .await?
                .into_iter()
                .map(record_from_remote)
                .collect::<Vec<_>>();
            snapshots.push((collection, records));
        }

        let mut count = 0;
        for (collection, records) in snapshots {
            self.local.replace_all(collection, &records).await?;
            tracing::debug!(collection = %collection, count = records.len(), "Replaced local collection");
            count += records.len();
        }

        tracing::info!(records = count, "Pulled remote records");
        Ok(json!({ "records": count }))
    }

    async fn merge_snapshot(&self, collection: &str, incoming: Vec<Record>) -> Result<MergeReport> {
        let local = self
            .local
            .read_all(collection)
            .await?
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect::<BTreeMap<_, _>>();

        let resolved_at = now_millis();
        let mut report = MergeReport::default();
        let mut accepted = BTreeMap::new();

        for record in incoming {
            match local.get(&record.id) {
                Some(existing) if existing.updated_at > record.updated_at => {
                    report.conflicts.push(SyncConflict {
                        collection: collection.to_string(),
                        record_id: record.id.clone(),
                        local_updated_at: existing.updated_at,
                        incoming_updated_at: record.updated_at,
                        resolved_at,
                        strategy: LAST_WRITE_WINS.to_string(),
                    });
                }
                Some(existing) if *existing == record => report.unchanged += 1,
                _ => {
                    accepted.insert(record.id.clone(), record);
                }
            }
        }

        // Upsert only what was accepted; writes landing after the read above
        // must survive the merge.
        report.applied = accepted.len();
        if !accepted.is_empty() {
            let records = accepted.into_values().collect::<Vec<_>>();
            self.local.bulk_insert(collection, &records).await?;
        }
        Ok(report)
    }

    fn principal(&self) -> Result<String> {
        self.auth.current_principal().ok_or(Error::Unauthenticated)
    }

    async fn traced<F>(&self, method: &str, target: &str, operation: F) -> SyncResult
    where
        F: Future<Output = Result<serde_json::Value>>,
    {
        let request = self.requests.begin(REQUEST_KIND, method, target);
        match operation.await {
            Ok(payload) => {
                self.requests
                    .end(request, RequestOutcome::success(Some(payload)));
                SyncResult::succeeded(now_millis())
            }
            Err(error) => {
                let message = error.to_string();
                tracing::error!(method, "Sync failed: {}", message);
                self.requests
                    .end(request, RequestOutcome::failure(message.clone()));
                SyncResult::failed(now_millis(), message)
            }
        }
    }
}
