//! Request and Reply Types
//!
//! ## Wire Format
//!
//! Requests are single text lines. After normalisation (trim, lowercase,
//! split on single spaces) they take one of four shapes:
//!
//! ```text
//! set <key> <value>
//! get <key>
//! del <key>
//! quit
//! ```
//!
//! Replies are raw bytes with no framing of their own:
//!
//! ```text
//! OK
//! <stored value>
//! ERR:key not found
//! ERR: invalid command
//! ```

use bytes::Bytes;
use std::fmt;

/// Reply text for a successful `set`/`del`/`quit`.
pub const OK: &str = "OK";

/// Reply text when `get` misses.
pub const KEY_NOT_FOUND: &str = "ERR:key not found";

/// Reply text for anything that is not a known command shape.
pub const INVALID_COMMAND: &str = "ERR: invalid command";

/// Broadcast to every live client when the server starts draining.
pub const SHUTDOWN_WARNING: &str = "server is closing soon";

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `set <key> <value>`
    Set { key: String, value: String },

    /// `get <key>`
    Get { key: String },

    /// `del <key>`
    Del { key: String },

    /// `quit`
    Quit,

    /// Any other token count or shape
    Invalid,
}

impl Command {
    /// Returns the command name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "set",
            Command::Get { .. } => "get",
            Command::Del { .. } => "del",
            Command::Quit => "quit",
            Command::Invalid => "invalid",
        }
    }
}

/// A reply to send back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `OK`
    Ok,

    /// The raw stored value
    Value(String),

    /// `ERR:key not found`
    KeyNotFound,

    /// `ERR: invalid command`
    InvalidCommand,

    /// The drain warning
    ShutdownWarning,
}

impl Reply {
    /// Serializes the reply to bytes for sending over the wire.
    ///
    /// `terminator`, when set, is appended after the reply body.
    pub fn serialize(&self, terminator: Option<&str>) -> Bytes {
        let body = self.as_str();
        match terminator {
            Some(t) => {
                let mut buf = Vec::with_capacity(body.len() + t.len());
                buf.extend_from_slice(body.as_bytes());
                buf.extend_from_slice(t.as_bytes());
                Bytes::from(buf)
            }
            None => Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Reply::Ok => OK,
            Reply::Value(v) => v,
            Reply::KeyNotFound => KEY_NOT_FOUND,
            Reply::InvalidCommand => INVALID_COMMAND,
            Reply::ShutdownWarning => SHUTDOWN_WARNING,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
