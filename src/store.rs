//! Persistent collection store: one JSON object file per named collection.
//!
//! Saves rewrite the whole collection through a temp file + rename so a crash
//! mid-write never leaves a partial file behind. Saves are best-effort: an I/O
//! error is logged and the in-memory mapping stays authoritative until the
//! process restarts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

pub struct PersistentStore {
    dir: PathBuf,
}

impl PersistentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Load a named collection. Absent or corrupt files yield an empty
    /// mapping; corruption is logged, never propagated.
    pub fn load<V: DeserializeOwned>(&self, name: &str) -> HashMap<String, V> {
        let path = self.path_for(name);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!(collection = name, error = %e, "failed to read collection, starting empty");
                return HashMap::new();
            }
        };

        match serde_json::from_str(&data) {
            Ok(records) => records,
            Err(e) => {
                error!(collection = name, error = %e, "corrupt collection file, starting empty");
                HashMap::new()
            }
        }
    }

    /// Overwrite a named collection with the full mapping. Best-effort: the
    /// caller's in-memory state remains authoritative on failure.
    pub fn save<V: Serialize>(&self, name: &str, records: &HashMap<String, V>) {
        if let Err(e) = self.try_save(name, records) {
            warn!(collection = name, error = %e, "failed to persist collection, keeping in-memory state");
        }
    }

    fn try_save<V: Serialize>(
        &self,
        name: &str,
        records: &HashMap<String, V>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_string_pretty(records)?;
        let path = self.path_for(name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        value: i64,
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = PersistentStore::new(dir.path());

        let mut records = HashMap::new();
        records.insert("a".to_string(), Record { value: 7 });
        records.insert("b".to_string(), Record { value: -3 });
        store.save("users", &records);

        let loaded: HashMap<String, Record> = store.load("users");
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_load_absent_is_empty() {
        let dir = tempdir().unwrap();
        let store = PersistentStore::new(dir.path());
        let loaded: HashMap<String, Record> = store.load("missing");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_corrupt_is_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("users.json"), "{not json").unwrap();

        let store = PersistentStore::new(dir.path());
        let loaded: HashMap<String, Record> = store.load("users");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_save_overwrites_whole_collection() {
        let dir = tempdir().unwrap();
        let store = PersistentStore::new(dir.path());

        let mut first = HashMap::new();
        first.insert("a".to_string(), Record { value: 1 });
        first.insert("b".to_string(), Record { value: 2 });
        store.save("users", &first);

        let mut second = HashMap::new();
        second.insert("a".to_string(), Record { value: 10 });
        store.save("users", &second);

        let loaded: HashMap<String, Record> = store.load("users");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["a"].value, 10);
    }

    #[test]
    fn test_no_leftover_temp_file() {
        let dir = tempdir().unwrap();
        let store = PersistentStore::new(dir.path());

        let mut records = HashMap::new();
        records.insert("a".to_string(), Record { value: 1 });
        store.save("users", &records);

        assert!(dir.path().join("users.json").exists());
        assert!(!dir.path().join("users.json.tmp").exists());
    }
}
