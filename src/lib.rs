//! # linekv - A Minimal Networked Key-Value Cache
//!
//! linekv is an in-memory key-value cache that speaks a newline-delimited
//! text protocol over TCP. Clients send `set`, `get`, `del` and `quit`; the
//! server applies them to one shared dictionary.
//!
//! ## Features
//!
//! - **Simple Protocol**: One request per line, raw replies
//! - **Concurrent**: One Tokio task per client, RwLock-guarded store
//! - **Graceful Shutdown**: Clients are warned, given a grace period, then closed
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               linekv                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │    Hub      │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener + │    │  Handler    │    │  Handler    │                  │
//! │  │  Registry)  │    └─────────────┘    └──────┬──────┘                  │
//! │  └─────────────┘                              │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐                   ┌─────────────────────┐              │
//! │  │    Line     │                   │   KeyValueStore     │              │
//! │  │   Parser    │                   │ RwLock<HashMap<..>> │              │
//! │  └─────────────┘                   └─────────────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use linekv::{Config, Hub, KeyValueStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = Arc::new(KeyValueStore::new(config.snapshot_path.clone()));
//!
//!     let hub = Hub::start(&config, store).await?;
//!     tokio::signal::ctrl_c().await?;
//!     hub.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `set key value` -> `OK`
//! - `get key` -> the value, or `ERR:key not found` (and the session ends)
//! - `del key` -> `OK`
//! - `quit` -> connection closed
//!
//! Anything else -> `ERR: invalid command`.
//!
//! ## Module Overview
//!
//! - [`protocol`]: Line decoding and reply types
//! - [`storage`]: Thread-safe key-value store
//! - [`commands`]: Applies commands to the store
//! - [`connection`]: Per-client handler loop and shared writer
//! - [`server`]: Accept loop, connection registry and shutdown
//! - [`config`]: Tunables and defaults

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::{AcceptErrorPolicy, Config, DrainMode, MissingKeyPolicy};
pub use connection::{ConnectionError, ConnectionHandler, ConnectionWriter};
pub use protocol::{parse_request, Command, Reply};
pub use server::{Hub, HubError, HubState};
pub use storage::{KeyValueStore, StoreError};

/// The default port linekv listens on
pub const DEFAULT_PORT: u16 = 6379;

/// The default host linekv binds to (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Version of linekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
