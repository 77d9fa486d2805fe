// Durable local queue of not-yet-confirmed brews, over the key-value port.
//
// Purpose
// - Keep every draft recoverable across process restarts, one record per
//   key, so each operation is a single durable write.
//
// Responsibilities
// - Generate client ids, order the pending queue oldest-first, remove
//   records only after server confirmation.
// - Surface every storage failure; nothing here is allowed to fail silently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::brew::{BrewPayload, DraftBrew, DraftState};
use crate::core::ports::{KeyValueStore, StorageError};

const DRAFT_PREFIX: &str = "brew-draft/";
const LAST_SYNC_KEY: &str = "brew-meta/last-sync";

pub struct DraftStore<K: KeyValueStore> {
    kv: Arc<K>,
}

impl<K: KeyValueStore> DraftStore<K> {
    pub fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    /// Persists a new pending draft and returns its client id. The write is
    /// durable before this returns; a failure here must reach the caller so
    /// the barista knows the brew was not saved.
    pub async fn enqueue(&self, payload: BrewPayload) -> Result<Uuid, StorageError> {
        let client_id = Uuid::now_v7();
        let draft = DraftBrew::new(client_id, payload, Utc::now());
        self.write(&draft).await?;
        tracing::debug!(%client_id, "draft enqueued");
        Ok(client_id)
    }

    /// All pending drafts, oldest first (ties broken by client id). Corrupt
    /// records are skipped with a warning and left on disk untouched.
    pub async fn list_pending(&self) -> Result<Vec<DraftBrew>, StorageError> {
        self.list_in_state(DraftState::Pending).await
    }

    /// Drafts the server rejected, awaiting human resolution.
    pub async fn list_failed(&self) -> Result<Vec<DraftBrew>, StorageError> {
        self.list_in_state(DraftState::Failed).await
    }

    pub async fn get(&self, client_id: Uuid) -> Result<Option<DraftBrew>, StorageError> {
        let key = draft_key(client_id);
        match self.kv.get(&key).await? {
            Some(json) => Ok(Some(parse_draft(&key, &json)?)),
            None => Ok(None),
        }
    }

    /// Durably removes a confirmed draft. Idempotent: a duplicate completion
    /// signal for an already-removed id is a no-op, not an error.
    pub async fn mark_synced(&self, client_id: Uuid) -> Result<(), StorageError> {
        self.kv.remove(&draft_key(client_id)).await?;
        tracing::debug!(%client_id, "draft removed after sync");
        Ok(())
    }

    /// Moves a server-rejected draft to the persisted failed state, taking it
    /// out of the automatic retry loop without discarding it.
    pub async fn mark_failed(&self, client_id: Uuid) -> Result<(), StorageError> {
        if let Some(mut draft) = self.get(client_id).await? {
            draft.state = DraftState::Failed;
            self.write(&draft).await?;
            tracing::warn!(%client_id, "draft marked failed");
        }
        Ok(())
    }

    /// Puts a failed draft back in the pending queue after human review.
    pub async fn retry_failed(&self, client_id: Uuid) -> Result<(), StorageError> {
        if let Some(mut draft) = self.get(client_id).await? {
            if draft.state == DraftState::Failed {
                draft.state = DraftState::Pending;
                self.write(&draft).await?;
                tracing::info!(%client_id, "failed draft re-queued");
            }
        }
        Ok(())
    }

    /// Increments the attempt counter. Telemetry only; state is unchanged.
    pub async fn record_attempt(&self, client_id: Uuid) -> Result<(), StorageError> {
        if let Some(mut draft) = self.get(client_id).await? {
            draft.attempt_count += 1;
            self.write(&draft).await?;
        }
        Ok(())
    }

    pub async fn pending_count(&self) -> Result<usize, StorageError> {
        Ok(self.list_pending().await?.len())
    }

    pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        match self.kv.get(LAST_SYNC_KEY).await? {
            Some(raw) => {
                let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|e| StorageError::Corrupt {
                    key: LAST_SYNC_KEY.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Some(parsed.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    pub async fn set_last_sync(&self, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.kv.put(LAST_SYNC_KEY, &at.to_rfc3339()).await
    }

    async fn list_in_state(&self, state: DraftState) -> Result<Vec<DraftBrew>, StorageError> {
        let mut drafts = Vec::new();
        for key in self.kv.keys(DRAFT_PREFIX).await? {
            let Some(json) = self.kv.get(&key).await? else {
                continue;
            };
            match parse_draft(&key, &json) {
                Ok(draft) if draft.state == state => drafts.push(draft),
                Ok(_) => {}
                Err(error) => {
                    // Left in place for repair; never silently deleted.
                    tracing::warn!(%key, %error, "skipping corrupt draft record");
                }
            }
        }
        drafts.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.client_id.cmp(&b.client_id))
        });
        Ok(drafts)
    }

    async fn write(&self, draft: &DraftBrew) -> Result<(), StorageError> {
        let json = serde_json::to_string(draft).map_err(|e| StorageError::Backend(e.to_string()))?;
        self.kv.put(&draft_key(draft.client_id), &json).await
    }
}

fn draft_key(client_id: Uuid) -> String {
    format!("{DRAFT_PREFIX}{client_id}")
}

fn parse_draft(key: &str, json: &str) -> Result<DraftBrew, StorageError> {
    serde_json::from_str(json).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod draft_store_tests {
    use super::*;
    use crate::adapters::in_memory::in_memory_key_value_store::InMemoryKeyValueStore;
    use crate::test_support::fixtures::payloads::BrewPayloadBuilder;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> DraftStore<InMemoryKeyValueStore> {
        DraftStore::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_enqueue_a_pending_draft_with_zero_attempts(
        store: DraftStore<InMemoryKeyValueStore>,
    ) {
        let client_id = store
            .enqueue(BrewPayloadBuilder::new().build())
            .await
            .expect("enqueue failed");

        let draft = store.get(client_id).await.unwrap().expect("draft missing");
        assert_eq!(draft.state, DraftState::Pending);
        assert_eq!(draft.attempt_count, 0);
        assert_eq!(store.pending_count().await.unwrap(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_list_pending_drafts_oldest_first(store: DraftStore<InMemoryKeyValueStore>) {
        let first = store
            .enqueue(BrewPayloadBuilder::new().name("first").build())
            .await
            .unwrap();
        let second = store
            .enqueue(BrewPayloadBuilder::new().name("second").build())
            .await
            .unwrap();
        let third = store
            .enqueue(BrewPayloadBuilder::new().name("third").build())
            .await
            .unwrap();

        let pending = store.list_pending().await.unwrap();
        let ids: Vec<Uuid> = pending.iter().map(|d| d.client_id).collect();
        assert_eq!(ids, vec![first, second, third]);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_remove_a_draft_on_mark_synced_and_stay_idempotent(
        store: DraftStore<InMemoryKeyValueStore>,
    ) {
        let client_id = store
            .enqueue(BrewPayloadBuilder::new().build())
            .await
            .unwrap();

        store.mark_synced(client_id).await.unwrap();
        assert!(store.get(client_id).await.unwrap().is_none());

        // Duplicate completion signal: a no-op, not an error.
        store.mark_synced(client_id).await.unwrap();
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_move_a_rejected_draft_between_failed_and_pending(
        store: DraftStore<InMemoryKeyValueStore>,
    ) {
        let client_id = store
            .enqueue(BrewPayloadBuilder::new().build())
            .await
            .unwrap();

        store.mark_failed(client_id).await.unwrap();
        assert_eq!(store.pending_count().await.unwrap(), 0);
        let failed = store.list_failed().await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].client_id, client_id);

        store.retry_failed(client_id).await.unwrap();
        assert_eq!(store.pending_count().await.unwrap(), 1);
        assert!(store.list_failed().await.unwrap().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_count_attempts_without_changing_state(
        store: DraftStore<InMemoryKeyValueStore>,
    ) {
        let client_id = store
            .enqueue(BrewPayloadBuilder::new().build())
            .await
            .unwrap();

        store.record_attempt(client_id).await.unwrap();
        store.record_attempt(client_id).await.unwrap();

        let draft = store.get(client_id).await.unwrap().unwrap();
        assert_eq!(draft.attempt_count, 2);
        assert_eq!(draft.state, DraftState::Pending);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_surface_a_quota_failure_from_enqueue() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        kv.set_quota(Some(8)).await;
        let store = DraftStore::new(kv);

        let result = store.enqueue(BrewPayloadBuilder::new().build()).await;
        assert!(matches!(result, Err(StorageError::QuotaExceeded)));
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_skip_a_corrupt_record_without_deleting_it(
        store: DraftStore<InMemoryKeyValueStore>,
    ) {
        let good = store
            .enqueue(BrewPayloadBuilder::new().build())
            .await
            .unwrap();
        store
            .kv
            .put("brew-draft/not-a-draft", "{ broken json")
            .await
            .unwrap();

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].client_id, good);
        // Still present for repair.
        assert!(store.kv.get("brew-draft/not-a-draft").await.unwrap().is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_persist_and_read_back_the_last_sync_timestamp(
        store: DraftStore<InMemoryKeyValueStore>,
    ) {
        assert_eq!(store.last_sync().await.unwrap(), None);
        let at = Utc::now();
        store.set_last_sync(at).await.unwrap();
        assert_eq!(store.last_sync().await.unwrap(), Some(at));
    }
}
