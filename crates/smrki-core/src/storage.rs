//! Persistent key-value storage for schedule data.
//!
//! The [`KeyValueStore`] trait is the platform contract: string values
//! addressed by string keys. [`ScheduleStore`] sits on top and always
//! round-trips the complete schedule list under [`SCHEDULES_KEY`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, SmrkiError};
use crate::types::Schedule;

/// Storage key holding the JSON-encoded schedule list.
pub const SCHEDULES_KEY: &str = "@schedules_v1";

/// Asynchronous string key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrites the value stored under `key`.
    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// File-backed store writing one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Create a new store rooted at `data_dir`.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory holding the stored files.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .trim_start_matches('@')
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.data_dir.join(format!("{file_stem}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SmrkiError::PersistenceError(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.key_path(key);
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| {
                SmrkiError::PersistenceError(format!(
                    "Failed to create directory {}: {e}",
                    self.data_dir.display()
                ))
            })?;

        // Write then rename so a crash never leaves a truncated file behind.
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, value).await.map_err(|e| {
            SmrkiError::PersistenceError(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
            SmrkiError::PersistenceError(format!("Failed to write {}: {e}", path.display()))
        })?;

        debug!(key, path = %path.display(), "Stored value");
        Ok(())
    }
}

/// In-process store, used for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Schedule persistence over any [`KeyValueStore`].
#[derive(Clone)]
pub struct ScheduleStore {
    backend: Arc<dyn KeyValueStore>,
}

impl ScheduleStore {
    /// Wrap a key-value backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Load the persisted schedule list.
    ///
    /// A missing key yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored JSON is invalid.
    pub async fn load(&self) -> Result<Vec<Schedule>> {
        match self.backend.get(SCHEDULES_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Overwrite the persisted schedule list with `schedules`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the backend write fails.
    pub async fn save(&self, schedules: &[Schedule]) -> Result<()> {
        let raw = serde_json::to_string(schedules)?;
        self.backend.set(SCHEDULES_KEY, raw).await
    }
}

/// Get the default data directory.
///
/// Resolves to the platform data dir, e.g. `~/.local/share/smrki/` on Linux.
///
/// # Errors
///
/// Returns an error if no home directory can be determined.
pub fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "smrki").ok_or_else(|| {
        SmrkiError::PersistenceError("Cannot determine data directory".into())
    })?;
    Ok(dirs.data_dir().to_path_buf())
}
