// In memory implementation of the KeyValueStore port.
//
// Purpose
// - Support engine tests and local development without touching disk.
//
// Responsibilities
// - Store string pairs in a map behind a lock.
// - Inject the substrate's failure modes on demand: unavailable storage and
//   quota exhaustion.
// - Expose the contents so tests can simulate a process restart by reopening
//   a second store over the same data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::core::ports::{KeyValueStore, StorageError};

#[derive(Default)]
pub struct InMemoryKeyValueStore {
    inner: RwLock<HashMap<String, String>>,
    quota_bytes: RwLock<Option<usize>>,
    offline: AtomicBool,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store over previously captured contents, simulating a
    /// reload in a fresh process.
    pub fn from_contents(contents: HashMap<String, String>) -> Self {
        Self {
            inner: RwLock::new(contents),
            quota_bytes: RwLock::new(None),
            offline: AtomicBool::new(false),
        }
    }

    pub async fn contents(&self) -> HashMap<String, String> {
        self.inner.read().await.clone()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Caps the total stored bytes; writes that would exceed it fail with
    /// `QuotaExceeded`. `None` lifts the cap.
    pub async fn set_quota(&self, bytes: Option<usize>) {
        *self.quota_bytes.write().await = bytes;
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut guard = self.inner.write().await;
        if let Some(quota) = *self.quota_bytes.read().await {
            let stored: usize = guard
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if stored + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.inner.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.check_available()?;
        let mut keys: Vec<String> = self
            .inner
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
