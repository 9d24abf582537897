use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::{KeyValueStore, StoreError};

/// File-backed store: each key is a pretty-printed JSON file in `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn retrieve(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.entry_path(key)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };
        let value = serde_json::from_str(&contents).map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    fn store(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        let contents = serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;

        // Write then rename so a crash never leaves a half-written entry
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })?;
        debug!(key = key, "Stored entry");
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(key = key, "Cleared entry");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
