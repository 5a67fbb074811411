use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::model::{TranslationItem, TranslationRecord};

/// Storage key holding the serialized history list.
pub const STORAGE_KEY: &str = "cantolearn_history_v1";
/// Upper bound on retained records.
pub const MAX_RECORDS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse history: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record with id {0} already exists")]
    DuplicateId(String),
}

/// String key-value storage, the shape of a browser's local storage.
pub trait Storage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove_item(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Keeps each key in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(value.as_bytes()).map_err(write_err)?;
        tmp.persist(&path).map_err(|err| write_err(err.error))?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write { path, source }),
        }
    }
}

/// In-process storage; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
        self.items.remove(key);
        Ok(())
    }
}

/// Newest-first list of translation records kept under [`STORAGE_KEY`].
#[derive(Debug, Clone)]
pub struct HistoryStore<S: Storage> {
    storage: S,
    limit: usize,
}

impl<S: Storage> HistoryStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            limit: MAX_RECORDS,
        }
    }

    /// Caps retention below [`MAX_RECORDS`]; never raises it.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_RECORDS);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn load(&self) -> Result<Vec<TranslationRecord>, StoreError> {
        let Some(json) = self.storage.get_item(STORAGE_KEY)? else {
            return Ok(Vec::new());
        };
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    /// Like [`load`](Self::load), but an unreadable or corrupted history is
    /// logged and treated as empty.
    pub fn get_history(&self) -> Vec<TranslationRecord> {
        self.load().unwrap_or_else(|err| {
            warn!("failed to load history, treating it as empty: {}", err);
            Vec::new()
        })
    }

    /// History as seen by the write paths. A corrupted blob is dropped so the
    /// next write replaces it; read failures propagate.
    fn load_for_write(&self) -> Result<Vec<TranslationRecord>, StoreError> {
        match self.load() {
            Err(StoreError::Json(err)) => {
                warn!("history is corrupted, starting over: {}", err);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    pub fn save_record(&mut self, record: TranslationRecord) -> Result<(), StoreError> {
        let mut history = self.load_for_write()?;
        if history.iter().any(|item| item.id == record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        history.insert(0, record);
        if history.len() > self.limit {
            let dropped = history.split_off(self.limit);
            debug!("dropped {} oldest history record(s)", dropped.len());
        }
        self.write(&history)
    }

    /// Replaces the results of the record with `id`. Returns `false` when no
    /// such record exists, in which case storage is left untouched.
    pub fn update_record(
        &mut self,
        id: &str,
        new_results: Vec<TranslationItem>,
    ) -> Result<bool, StoreError> {
        let mut history = self.load_for_write()?;
        let Some(record) = history.iter_mut().find(|item| item.id == id) else {
            return Ok(false);
        };
        record.results = new_results;
        self.write(&history)?;
        Ok(true)
    }

    /// Removes the record with `id`. Returns `false` when it was not present.
    pub fn delete_record(&mut self, id: &str) -> Result<bool, StoreError> {
        let history = self.load_for_write()?;
        let before = history.len();
        let updated = history
            .into_iter()
            .filter(|item| item.id != id)
            .collect::<Vec<_>>();
        if updated.len() == before {
            return Ok(false);
        }
        self.write(&updated)?;
        Ok(true)
    }

    pub fn clear_history(&mut self) -> Result<(), StoreError> {
        self.storage.remove_item(STORAGE_KEY)
    }

    fn write(&mut self, history: &[TranslationRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string(history)?;
        self.storage.set_item(STORAGE_KEY, &json)
    }
}

fn sanitize_key(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "item".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn item(text: &str, jyutping: &str, pos: &str) -> TranslationItem {
        TranslationItem {
            text: text.to_string(),
            jyutping: jyutping.to_string(),
            part_of_speech: pos.to_string(),
        }
    }

    fn record(id: &str, text: &str, timestamp: i64) -> TranslationRecord {
        TranslationRecord {
            id: id.to_string(),
            original_text: text.to_string(),
            results: vec![item(text, "", "General")],
            timestamp,
        }
    }

    fn memory_store() -> HistoryStore<MemoryStorage> {
        HistoryStore::new(MemoryStorage::new())
    }

    #[test]
    fn saved_record_comes_first() {
        let mut store = memory_store();
        store.save_record(record("a", "食飯", 1)).unwrap();
        store.save_record(record("b", "瞓覺", 2)).unwrap();
        let history = store.get_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, "b");
        assert_eq!(history[1].id, "a");
    }

    #[test]
    fn save_into_empty_store_round_trips_the_record() {
        let mut store = memory_store();
        let saved = TranslationRecord {
            id: "a".to_string(),
            original_text: "我想食飯".to_string(),
            results: vec![item("食飯", "sik6 faan6", "Verb")],
            timestamp: 1000,
        };
        store.save_record(saved.clone()).unwrap();
        assert_eq!(store.get_history(), vec![saved]);
    }

    #[test]
    fn history_is_capped_at_fifty_dropping_the_oldest() {
        let mut store = memory_store();
        for index in 0..51 {
            store
                .save_record(record(&format!("r{}", index), "字", index))
                .unwrap();
        }
        let history = store.get_history();
        assert_eq!(history.len(), MAX_RECORDS);
        assert_eq!(history[0].id, "r50");
        assert_eq!(history[MAX_RECORDS - 1].id, "r1");
        assert!(history.iter().all(|item| item.id != "r0"));
    }

    #[test]
    fn custom_limit_is_clamped() {
        let store = memory_store().with_limit(500);
        assert_eq!(store.limit(), MAX_RECORDS);
        let mut store = memory_store().with_limit(2);
        for id in ["a", "b", "c"] {
            store.save_record(record(id, id, 0)).unwrap();
        }
        let ids = store
            .get_history()
            .into_iter()
            .map(|item| item.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut store = memory_store();
        store.save_record(record("a", "食飯", 1)).unwrap();
        let err = store.save_record(record("a", "瞓覺", 2)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == "a"));
        let history = store.get_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].original_text, "食飯");
    }

    #[test]
    fn update_replaces_only_the_matching_results() {
        let mut store = memory_store();
        store.save_record(record("a", "食飯", 1)).unwrap();
        store.save_record(record("b", "瞓覺", 2)).unwrap();
        let before = store.get_history();

        let new_results = vec![item("食嘢", "sik6 je5", "Colloquial")];
        assert!(store.update_record("a", new_results.clone()).unwrap());

        let after = store.get_history();
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1].results, new_results);
        assert_eq!(after[1].id, before[1].id);
        assert_eq!(after[1].original_text, before[1].original_text);
        assert_eq!(after[1].timestamp, before[1].timestamp);
    }

    #[test]
    fn update_of_unknown_id_leaves_store_unchanged() {
        let mut store = memory_store();
        store.save_record(record("a", "食飯", 1)).unwrap();
        let before = store.get_history();
        assert!(!store.update_record("missing", Vec::new()).unwrap());
        assert_eq!(store.get_history(), before);
    }

    #[test]
    fn delete_removes_exactly_the_matching_record() {
        let mut store = memory_store();
        store.save_record(record("a", "食飯", 1)).unwrap();
        store.save_record(record("b", "瞓覺", 2)).unwrap();
        assert!(store.delete_record("b").unwrap());
        let history = store.get_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "a");

        assert!(!store.delete_record("b").unwrap());
        assert_eq!(store.get_history().len(), 1);
    }

    #[test]
    fn malformed_json_yields_empty_history() {
        let mut storage = MemoryStorage::new();
        storage.set_item(STORAGE_KEY, "{not json").unwrap();
        let store = HistoryStore::new(storage);
        assert!(store.load().is_err());
        assert!(store.get_history().is_empty());
    }

    #[test]
    fn save_over_corrupted_history_starts_fresh() {
        let mut storage = MemoryStorage::new();
        storage.set_item(STORAGE_KEY, "[{\"id\":").unwrap();
        let mut store = HistoryStore::new(storage);
        store.save_record(record("a", "食飯", 1)).unwrap();
        assert_eq!(store.get_history().len(), 1);
    }

    #[test]
    fn clear_history_removes_everything() {
        let mut store = memory_store();
        store.save_record(record("a", "食飯", 1)).unwrap();
        store.clear_history().unwrap();
        assert!(store.get_history().is_empty());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempdir().expect("tempdir");
        let mut store = HistoryStore::new(FileStorage::new(dir.path()));
        store.save_record(record("a", "食飯", 1)).unwrap();

        let reopened = HistoryStore::new(FileStorage::new(dir.path()));
        let history = reopened.get_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "a");
        assert!(dir.path().join("cantolearn_history_v1.json").exists());
    }

    #[test]
    fn file_storage_missing_key_reads_as_none() {
        let dir = tempdir().expect("tempdir");
        let mut storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.get_item("absent").unwrap(), None);
        storage.remove_item("absent").unwrap();
    }

    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set_item(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Write {
                path: PathBuf::from(key),
                source: io::Error::new(io::ErrorKind::Other, "quota exceeded"),
            })
        }

        fn remove_item(&mut self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_propagate_to_the_caller() {
        let mut store = HistoryStore::new(ReadOnlyStorage);
        let err = store.save_record(record("a", "食飯", 1)).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    /// Memory storage whose reads can be switched off after seeding.
    #[derive(Clone, Default)]
    struct FlakyStorage {
        items: std::rc::Rc<std::cell::RefCell<HashMap<String, String>>>,
        fail_reads: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl Storage for FlakyStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail_reads.get() {
                return Err(StoreError::Read {
                    path: PathBuf::from(key),
                    source: io::Error::new(io::ErrorKind::Other, "disk unavailable"),
                });
            }
            Ok(self.items.borrow().get(key).cloned())
        }

        fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.items
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
            self.items.borrow_mut().remove(key);
            Ok(())
        }
    }

    #[test]
    fn read_failures_leave_stored_history_untouched() {
        let storage = FlakyStorage::default();
        let mut store = HistoryStore::new(storage.clone());
        for (id, text) in [("a", "一"), ("b", "二"), ("c", "三")] {
            store.save_record(record(id, text, 0)).unwrap();
        }
        let before = storage.items.borrow().get(STORAGE_KEY).cloned();

        storage.fail_reads.set(true);
        let err = store.save_record(record("d", "四", 1)).unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));
        assert!(store.update_record("a", Vec::new()).is_err());
        assert!(store.delete_record("a").is_err());
        assert!(store.get_history().is_empty());
        assert_eq!(storage.items.borrow().get(STORAGE_KEY).cloned(), before);

        storage.fail_reads.set(false);
        assert_eq!(store.get_history().len(), 3);
    }
}
