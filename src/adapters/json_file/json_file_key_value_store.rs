// Durable implementation of the KeyValueStore port over one JSON document.
//
// Purpose
// - Give the draft queue a persistence home that survives process restarts,
//   the native stand-in for the browser's persistent storage.
//
// Responsibilities
// - Write through on every mutation: serialize the whole map, write to a
//   sibling temp file, fsync, then rename over the live file. A mutation has
//   either fully happened or not at all.
//
// Notes
// - The document holds a handful of small drafts; rewriting it whole per
//   mutation is cheap and keeps recovery trivial.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::core::ports::{KeyValueStore, StorageError};

pub struct JsonFileKeyValueStore {
    path: PathBuf,
    inner: Mutex<HashMap<String, String>>,
}

impl JsonFileKeyValueStore {
    /// Opens (or creates) the store at `path`. An unreadable or unparsable
    /// document is surfaced, never silently replaced.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let contents = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StorageError::Unavailable(e.to_string())),
        };
        Ok(Self {
            path,
            inner: Mutex::new(contents),
        })
    }

    fn persist(&self, contents: &HashMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(contents)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        write_durably(&tmp, json.as_bytes())?;
        fs::rename(&tmp, &self.path).map_err(map_io_error)?;
        Ok(())
    }
}

fn write_durably(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = fs::File::create(path).map_err(map_io_error)?;
    file.write_all(bytes).map_err(map_io_error)?;
    file.sync_all().map_err(map_io_error)?;
    Ok(())
}

fn map_io_error(e: std::io::Error) -> StorageError {
    match e.kind() {
        std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded => {
            StorageError::QuotaExceeded
        }
        _ => StorageError::Unavailable(e.to_string()),
    }
}

#[async_trait::async_trait]
impl KeyValueStore for JsonFileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.inner.lock().await;
        let previous = guard.insert(key.to_string(), value.to_string());
        if let Err(error) = self.persist(&guard) {
            // Keep memory consistent with disk on failure.
            match previous {
                Some(previous) => guard.insert(key.to_string(), previous),
                None => guard.remove(key),
            };
            return Err(error);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.inner.lock().await;
        let Some(previous) = guard.remove(key) else {
            return Ok(());
        };
        if let Err(error) = self.persist(&guard) {
            guard.insert(key.to_string(), previous);
            return Err(error);
        }
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self
            .inner
            .lock()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod json_file_key_value_store_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn it_should_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");

        {
            let store = JsonFileKeyValueStore::open(&path).unwrap();
            store.put("draft/1", "espresso").await.unwrap();
            store.put("draft/2", "filter").await.unwrap();
            store.remove("draft/2").await.unwrap();
        }

        let reopened = JsonFileKeyValueStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("draft/1").await.unwrap(),
            Some("espresso".to_string())
        );
        assert_eq!(reopened.get("draft/2").await.unwrap(), None);
        assert_eq!(reopened.keys("draft/").await.unwrap(), vec!["draft/1"]);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_start_empty_when_the_file_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileKeyValueStore::open(dir.path().join("missing.json")).unwrap();
        assert_eq!(store.get("anything").await.unwrap(), None);
        assert!(store.keys("").await.unwrap().is_empty());
    }

    #[rstest]
    fn it_should_refuse_to_open_a_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");
        fs::write(&path, "{ not json").unwrap();

        let result = JsonFileKeyValueStore::open(&path);
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
        // The document is left in place for repair.
        assert!(path.exists());
    }
}
