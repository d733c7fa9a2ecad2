//! Storage Module
//!
//! This module provides the shared in-memory store for linekv: a single
//! reader-writer lock over a `HashMap<String, String>`.
//!
//! ## Example
//!
//! ```
//! use linekv::storage::KeyValueStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(KeyValueStore::new("snapshot.json"));
//!
//! store.set("name", "ada");
//! assert_eq!(store.get("name").as_deref(), Ok("ada"));
//! ```

pub mod engine;

pub use engine::{KeyValueStore, StoreError};
