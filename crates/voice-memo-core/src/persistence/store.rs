use crate::{CoreResult, RecorderError};

use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tracing::{debug, instrument};

/// Durable string storage addressed by key.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> CoreResult<Option<String>>;

    /// Replaces the value under `key`. A crash mid-write leaves the previous value intact.
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;

    /// Deletes `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> CoreResult<()>;
}

/// One TOML file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Opens `dir`, creating it if needed.
    #[track_caller]
    pub fn new<P: AsRef<Path>>(dir: P) -> CoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| RecorderError::io(&dir, e))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.toml", key))
    }
}

impl KeyValueStore for FileKeyValueStore {
    #[track_caller]
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RecorderError::io(path, e)),
        }
    }

    /// Writes to a temporary file first, then renames over the old value.
    #[track_caller]
    #[instrument(skip(self, value))]
    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file =
            fs::File::create(&temp_path).map_err(|e| RecorderError::io(&temp_path, e))?;
        temp_file
            .write_all(value.as_bytes())
            .map_err(|e| RecorderError::io(&temp_path, e))?;
        temp_file
            .sync_all()
            .map_err(|e| RecorderError::io(&temp_path, e))?;

        fs::rename(&temp_path, &path).map_err(|e| RecorderError::io(&path, e))?;

        debug!(path = ?path, "Value stored (atomic write)");

        Ok(())
    }

    #[track_caller]
    fn remove(&self, key: &str) -> CoreResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RecorderError::io(path, e)),
        }
    }
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}
