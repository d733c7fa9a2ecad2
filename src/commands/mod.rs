//! Command Handler Module
//!
//! This module implements the request processing layer for linekv.
//! It receives decoded commands, executes them against the store,
//! and returns the reply together with what the connection should do next.
//!
//! ## Architecture
//!
//! ```text
//! Client Line
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ KeyValueStore   │  (storage module)
//! └─────────────────┘
//! ```

pub mod handler;

pub use handler::{Action, CommandHandler, Outcome};
