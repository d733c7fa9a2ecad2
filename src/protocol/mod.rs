//! Line Protocol Implementation
//!
//! This module defines the text protocol spoken by linekv clients.
//!
//! ## Modules
//!
//! - `types`: `Command` and `Reply`, plus the reply vocabulary
//! - `parser`: Normalises a raw line and decodes it into a `Command`
//!
//! ## Example
//!
//! ```
//! use linekv::protocol::{parse_request, Command, Reply};
//!
//! let command = parse_request("get name");
//! assert_eq!(command, Command::Get { key: "name".into() });
//!
//! let bytes = Reply::Value("ada".into()).serialize(None);
//! assert_eq!(&bytes[..], b"ada");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_request, tokenize};
pub use types::{Command, Reply};
