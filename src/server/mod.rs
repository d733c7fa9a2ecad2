//! Server Module
//!
//! The [`Hub`] accepts clients, runs one handler task per connection, keeps
//! the registry of live connections and implements the shutdown protocol.
//!
//! ## Shutdown
//!
//! ```text
//! stop() ──> accept loop sees the signal
//!              │
//!              ▼
//!        close listener
//!              │
//!              ▼  (only if connections are live)
//!        warn every client: "server is closing soon"
//!              │
//!              ▼
//!        wait the grace period (10s by default)
//!              │
//!              ▼
//!        force close whatever is still registered
//!              │
//!              ▼
//!        Stopped ──> stop() returns
//! ```

pub mod hub;
pub mod registry;

pub use hub::{Hub, HubError, HubState};
pub use registry::ConnectionRegistry;
