//! Connection Handler Module
//!
//! This module manages individual client connections to linekv.
//! Each client connection is handled by its own task, so one slow client
//! never holds up another.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Hub accept loop                         │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ register + spawn
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read lines  │───>│ Decode line │───>│ Execute cmd │     │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘     │
//! │                                               ▼             │
//! │                                      ┌────────────────┐     │
//! │                                      │ConnectionWriter│<── hub (warn/close)
//! │                                      └────────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod handler;
pub mod writer;

pub use handler::{
    CloseReason, ConnectionError, ConnectionHandler, ConnectionId, MAX_LINE_LENGTH,
};
pub use writer::{write_to_client, ConnectionWriter};
