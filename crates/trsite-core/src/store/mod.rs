//! Durable key-value storage for client state.
//!
//! The authenticator persists the session through the `KeyValueStore`
//! trait. Two implementations are provided:
//! - `FileStore`: one JSON file per key, survives restarts
//! - `MemoryStore`: an in-process map shared between clones (tests, embedding)

pub mod file;
pub mod memory;

use serde_json::Value;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode value for key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid store key: {0:?}")]
    InvalidKey(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Synchronous key-value store holding JSON documents.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, `None` if nothing is stored
    fn retrieve(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write `value` under `key`, replacing any previous value
    fn store(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Remove `key`. Clearing a missing key is not an error.
    fn clear(&self, key: &str) -> Result<(), StoreError>;
}

/// Lets several owners share one store behind an `Arc`.
impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn retrieve(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).retrieve(key)
    }

    fn store(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        (**self).store(key, value)
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        (**self).clear(key)
    }
}
