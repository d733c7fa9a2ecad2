//! Thread-Safe Key-Value Store
//!
//! This module implements the shared in-memory dictionary behind linekv.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             KeyValueStore               │
//! │  ┌───────────────────────────────────┐  │
//! │  │ RwLock<HashMap<String, String>>   │  │
//! │  │   set / delete  -> write lock     │  │
//! │  │   get           -> read lock      │  │
//! │  └───────────────────────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! One lock guards the whole map. Readers run concurrently with each other,
//! never with a writer, so no reader ever observes a half-applied write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors returned by store lookups.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested key is not present
    #[error("key not found")]
    KeyNotFound,
}

/// The shared key-value store.
///
/// Wrap it in an `Arc` and hand a clone to every connection task.
///
/// # Example
///
/// ```
/// use linekv::storage::{KeyValueStore, StoreError};
///
/// let store = KeyValueStore::new("snapshot.json");
///
/// store.set("name", "ada");
/// assert_eq!(store.get("name"), Ok("ada".to_string()));
///
/// store.delete("name");
/// assert_eq!(store.get("name"), Err(StoreError::KeyNotFound));
/// ```
pub struct KeyValueStore {
    /// The actual data
    data: RwLock<HashMap<String, String>>,

    /// Where a snapshot would be written. Kept for the entry point; the
    /// store itself never touches the file.
    snapshot_path: PathBuf,
}

impl std::fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueStore")
            .field("keys", &self.len())
            .field("snapshot_path", &self.snapshot_path)
            .finish()
    }
}

impl KeyValueStore {
    /// Creates an empty store.
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            snapshot_path: snapshot_path.into(),
        }
    }

    // Writes are a single insert or remove, so a poisoned map is still whole.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets a key, overwriting any existing value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write().insert(key.into(), value.into());
    }

    /// Gets the current value for a key.
    ///
    /// Returns [`StoreError::KeyNotFound`] if the key was never set or has
    /// been deleted.
    pub fn get(&self, key: &str) -> Result<String, StoreError> {
        self.read().get(key).cloned().ok_or(StoreError::KeyNotFound)
    }

    /// Deletes a key.
    ///
    /// Deleting an absent key is not an error. Returns `true` if a key was
    /// actually removed.
    pub fn delete(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns the configured snapshot location.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}
