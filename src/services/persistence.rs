//! Durable key-value storage for settings, recovery snapshots and usage

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::StoreError;

/// Generic structured key-value store.
///
/// Values are JSON documents stored as text. Records survive restarts of the
/// same process when backed by [`FileStore`]; nothing is synchronized across
/// machines.
pub trait Persistence: Send + Sync {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Serialize `value` and store it under `key`
pub fn save_json<T: Serialize>(
    store: &dyn Persistence,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let text = serde_json::to_string(value)?;
    store.save(key, &text)
}

/// Load and deserialize the record under `key`, if any
pub fn load_json<T: DeserializeOwned>(
    store: &dyn Persistence,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.load(key)? {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

/// Store keeping one `<key>.json` file per record inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!("Opened file store at {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl Persistence for FileStore {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        // Write beside the target and rename so readers never see a torn record.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store; everything is lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }
}

impl Persistence for MemoryStore {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        minutes: u32,
    }

    #[test]
    fn file_store_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        save_json(&store, "wellness-timer-settings", &Record { minutes: 30 }).unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        let loaded: Option<Record> = load_json(&reopened, "wellness-timer-settings").unwrap();
        assert_eq!(loaded, Some(Record { minutes: 30 }));
    }

    #[test]
    fn file_store_missing_and_deleted_keys_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.load("absent").unwrap(), None);

        store.save("present", "{}").unwrap();
        store.delete("present").unwrap();
        store.delete("present").unwrap();
        assert_eq!(store.load("present").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.save("../escape", "{}"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn corrupt_record_surfaces_as_serialization_error() {
        let store = MemoryStore::new();
        store.save("broken", "{not json").unwrap();
        let result: Result<Option<Record>, _> = load_json(&store, "broken");
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
