//! Command Handler Module
//!
//! Applies decoded requests to the store and decides what the connection
//! should do next.
//!
//! ## Supported Commands
//!
//! - `set key value` - Set a key, reply `OK`
//! - `get key` - Reply with the value, or `ERR:key not found`
//! - `del key` - Delete a key, reply `OK` whether or not it existed
//! - `quit` - Close the connection, then try to reply `OK`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ parse line  │───>│  dispatch   │───>│   Outcome   │     │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                      KeyValueStore                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::config::MissingKeyPolicy;
use crate::protocol::{parse_request, Command, Reply};
use crate::storage::{KeyValueStore, StoreError};
use std::sync::Arc;

/// What the connection loop must do with a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send the reply and read the next line
    Continue,

    /// Send the reply, then end the session
    CloseAfterReply,

    /// Close the transport first, then attempt to send the reply
    CloseBeforeReply,
}

/// The result of handling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub reply: Reply,
    pub action: Action,
}

impl Outcome {
    fn reply(reply: Reply) -> Self {
        Self {
            reply,
            action: Action::Continue,
        }
    }
}

/// Handles requests by dispatching them to the store.
#[derive(Clone)]
pub struct CommandHandler {
    /// The shared store
    store: Arc<KeyValueStore>,
    /// What to do after a `get` miss
    missing_key_policy: MissingKeyPolicy,
}

impl CommandHandler {
    /// Creates a new command handler with the given store.
    pub fn new(store: Arc<KeyValueStore>, missing_key_policy: MissingKeyPolicy) -> Self {
        Self {
            store,
            missing_key_policy,
        }
    }

    /// Decodes one raw line and executes it.
    pub fn handle_line(&self, line: &str) -> Outcome {
        self.execute(parse_request(line))
    }

    /// Executes a command and returns the reply and follow-up action.
    pub fn execute(&self, command: Command) -> Outcome {
        match command {
            Command::Set { key, value } => {
                self.store.set(key, value);
                Outcome::reply(Reply::Ok)
            }
            Command::Get { key } => self.cmd_get(&key),
            Command::Del { key } => {
                self.store.delete(&key);
                Outcome::reply(Reply::Ok)
            }
            Command::Quit => Outcome {
                reply: Reply::Ok,
                action: Action::CloseBeforeReply,
            },
            Command::Invalid => Outcome::reply(Reply::InvalidCommand),
        }
    }

    fn cmd_get(&self, key: &str) -> Outcome {
        match self.store.get(key) {
            Ok(value) => Outcome::reply(Reply::Value(value)),
            Err(StoreError::KeyNotFound) => Outcome {
                reply: Reply::KeyNotFound,
                action: match self.missing_key_policy {
                    MissingKeyPolicy::CloseConnection => Action::CloseAfterReply,
                    MissingKeyPolicy::KeepOpen => Action::Continue,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_handler() -> CommandHandler {
        let store = Arc::new(KeyValueStore::new("snapshot.json"));
        CommandHandler::new(store, MissingKeyPolicy::CloseConnection)
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        let outcome = handler.handle_line("set foo bar");
        assert_eq!(outcome, Outcome::reply(Reply::Ok));

        let outcome = handler.handle_line("get foo");
        assert_eq!(outcome, Outcome::reply(Reply::Value("bar".to_string())));
    }

    #[test]
    fn test_get_nonexistent_closes() {
        let handler = create_handler();

        let outcome = handler.handle_line("get missing");
        assert_eq!(outcome.reply, Reply::KeyNotFound);
        assert_eq!(outcome.action, Action::CloseAfterReply);
    }

    #[test]
    fn test_get_nonexistent_keep_open() {
        let store = Arc::new(KeyValueStore::new("snapshot.json"));
        let handler = CommandHandler::new(store, MissingKeyPolicy::KeepOpen);

        let outcome = handler.handle_line("get missing");
        assert_eq!(outcome, Outcome::reply(Reply::KeyNotFound));
    }

    #[test]
    fn test_del() {
        let handler = create_handler();

        handler.handle_line("set foo bar");
        assert_eq!(handler.handle_line("del foo"), Outcome::reply(Reply::Ok));
        assert_eq!(handler.handle_line("get foo").reply, Reply::KeyNotFound);
    }

    #[test]
    fn test_del_missing_is_ok() {
        let handler = create_handler();
        assert_eq!(handler.handle_line("del foo"), Outcome::reply(Reply::Ok));
    }

    #[test]
    fn test_quit() {
        let handler = create_handler();

        let outcome = handler.handle_line("QUIT");
        assert_eq!(outcome.reply, Reply::Ok);
        assert_eq!(outcome.action, Action::CloseBeforeReply);
    }

    #[test]
    fn test_invalid_keeps_session() {
        let handler = create_handler();

        let outcome = handler.handle_line("foo bar baz qux");
        assert_eq!(outcome, Outcome::reply(Reply::InvalidCommand));
    }

    #[test]
    fn test_writes_are_shared() {
        let store = Arc::new(KeyValueStore::new("snapshot.json"));
        let a = CommandHandler::new(Arc::clone(&store), MissingKeyPolicy::CloseConnection);
        let b = a.clone();

        a.handle_line("set shared 1");
        assert_eq!(b.handle_line("get shared").reply, Reply::Value("1".to_string()));
        assert_eq!(store.len(), 1);
    }
}
