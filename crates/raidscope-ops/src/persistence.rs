//! String key-value persistence consumed by the tracker.

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use raidscope_types::{RaidscopeError, Result};
use tracing::debug;

pub const OBSERVATIONS_KEY: &str = "observations";
pub const WORLD_SPEED_KEY: &str = "speed.world";
pub const UNIT_SPEED_KEY: &str = "speed.unit";

pub trait PersistenceStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: PersistenceStore + ?Sized> PersistenceStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Process-local store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| persistence_error("failed to lock memory store"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| persistence_error("failed to lock memory store"))?;
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// A single JSON object file mapping string keys to string values.
///
/// The whole file is rewritten on every `set`, through a sibling temp file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Arc<Mutex<BTreeMap<String, String>>>,
}

impl JsonFileStore {
    /// Opens `path`; a missing file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                persistence_error(format!("malformed state file {}: {err}", path.display()))
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(persistence_error(format!(
                    "unable to read state file {}: {err}",
                    path.display()
                )))
            }
        };
        debug!(path = %path.display(), keys = values.len(), "opened state file");
        Ok(Self {
            path,
            values: Arc::new(Mutex::new(values)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let doc = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, doc).map_err(|err| {
            persistence_error(format!("unable to write {}: {err}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            persistence_error(format!("unable to replace {}: {err}", self.path.display()))
        })
    }
}

impl PersistenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| persistence_error("failed to lock state file cache"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| persistence_error("failed to lock state file cache"))?;
        values.insert(key.to_owned(), value.to_owned());
        self.flush(&values)
    }
}

pub fn persistence_error(message: impl Into<String>) -> RaidscopeError {
    RaidscopeError::Persistence(message.into())
}
