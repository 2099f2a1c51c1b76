//! Shared key-value storage for the calorie state
//!
//! The wheel app writes, the home widget reads. Both go through the narrow
//! [`KeyValueStore`] contract: `get` returns a value or nothing (caller picks
//! the default), `set` returns once the value is committed.

use directories::ProjectDirs;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Environment variable that overrides the state file location
pub const STATE_PATH_ENV: &str = "CALORIE_WHEEL_STATE";

/// Persisted keys, shared with the display widget
pub mod keys {
    pub const CURRENT_CALORIES: &str = "current_calories";
    pub const DAILY_GOAL: &str = "daily_goal";
    pub const INCREMENT: &str = "calorie_increment";
    pub const LAST_UPDATE_DATE: &str = "last_update_date";
    pub const HISTORY: &str = "calorie_history";
    pub const HAS_SEEN_ONBOARDING: &str = "has_seen_onboarding";
}

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not determine data directory")]
    NoDataDir,
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Flat key-value record persisted across processes
pub trait KeyValueStore {
    /// The stored value, or `None` if the key was never written
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value. `Ok` means the write is durable.
    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError>;

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_integer())
    }

    fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Box<K> {
    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// In-process store, nothing touches disk
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Table,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: Table) -> Self {
        Self { table }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.table.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        self.table.insert(key.to_string(), value);
        Ok(())
    }
}

/// A TOML file holding the whole record.
///
/// Each `set` rewrites the file through a temporary sibling and a rename, so a
/// reader in another process sees either the old record or the new one.
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
    table: Table,
}

impl TomlFileStore {
    /// Open the store at `path`. A missing file is an empty record.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let table = read_table(&path)?;
        Ok(Self { path, table })
    }

    /// Open the store at the default shared location
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(state_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file to pick up writes from another process
    pub fn reload(&mut self) -> Result<(), StorageError> {
        self.table = read_table(&self.path)?;
        Ok(())
    }

    fn commit(&self) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let contents = toml::to_string_pretty(&self.table)?;
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, contents).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStore for TomlFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.table.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        self.table.insert(key.to_string(), value);
        self.commit()
    }
}

fn read_table(path: &Path) -> Result<Table, StorageError> {
    match fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<Table>(&contents).map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Table::new()),
        Err(source) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Location of the shared state file
pub fn state_path() -> Result<PathBuf, StorageError> {
    if let Some(path) = std::env::var_os(STATE_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    ProjectDirs::from("com", "caloriewheel", "calorie-wheel")
        .map(|dirs| dirs.data_dir().join("state.toml"))
        .ok_or(StorageError::NoDataDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_state_path() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir()
            .join(format!("calorie-wheel-storage-{}-{}", std::process::id(), n))
            .join("state.toml")
    }

    #[test]
    fn test_memory_store_typed_getters() {
        let mut store = MemoryStore::new();
        store.set(keys::DAILY_GOAL, Value::Integer(2000)).unwrap();
        store
            .set(keys::LAST_UPDATE_DATE, Value::String("2025-100".into()))
            .unwrap();
        store.set(keys::HAS_SEEN_ONBOARDING, Value::Boolean(true)).unwrap();

        assert_eq!(store.get_int(keys::DAILY_GOAL), Some(2000));
        assert_eq!(store.get_str(keys::LAST_UPDATE_DATE).as_deref(), Some("2025-100"));
        assert_eq!(store.get_bool(keys::HAS_SEEN_ONBOARDING), Some(true));
        assert_eq!(store.get_int(keys::CURRENT_CALORIES), None);
        // Wrong type reads as absent
        assert_eq!(store.get_str(keys::DAILY_GOAL), None);
    }

    #[test]
    fn test_boxed_store_delegates() {
        let mut store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        store.set(keys::INCREMENT, Value::Integer(25)).unwrap();
        assert_eq!(store.get_int(keys::INCREMENT), Some(25));
    }

    #[test]
    fn test_missing_file_is_empty_record() {
        let store = TomlFileStore::open(temp_state_path()).unwrap();
        assert!(store.get(keys::CURRENT_CALORIES).is_none());
    }

    #[test]
    fn test_file_store_commits_every_write() {
        let path = temp_state_path();
        let mut writer = TomlFileStore::open(&path).unwrap();
        writer.set(keys::CURRENT_CALORIES, Value::Integer(750)).unwrap();

        let reader = TomlFileStore::open(&path).unwrap();
        assert_eq!(reader.get_int(keys::CURRENT_CALORIES), Some(750));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_reload_sees_other_writer() {
        let path = temp_state_path();
        let mut writer = TomlFileStore::open(&path).unwrap();
        let mut reader = TomlFileStore::open(&path).unwrap();

        writer.set(keys::DAILY_GOAL, Value::Integer(1800)).unwrap();
        assert_eq!(reader.get_int(keys::DAILY_GOAL), None);

        reader.reload().unwrap();
        assert_eq!(reader.get_int(keys::DAILY_GOAL), Some(1800));
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let path = temp_state_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "current_calories = = 3").unwrap();

        let err = TomlFileStore::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
    }

    #[test]
    fn test_history_table_round_trips_through_file() {
        let path = temp_state_path();
        let mut writer = TomlFileStore::open(&path).unwrap();
        let mut entry = Table::new();
        entry.insert("calories".into(), Value::Integer(1800));
        entry.insert("goal".into(), Value::Integer(2000));
        let mut history = Table::new();
        history.insert("2025-100".into(), Value::Table(entry));
        writer.set(keys::HISTORY, Value::Table(history)).unwrap();

        let reader = TomlFileStore::open(&path).unwrap();
        let history = reader.get(keys::HISTORY).unwrap();
        assert_eq!(history["2025-100"]["calories"].as_integer(), Some(1800));
    }
}
