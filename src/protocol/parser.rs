//! Line Request Parser
//!
//! Turns one raw input line into a [`Command`]. Parsing never fails: input
//! that does not match a known shape becomes [`Command::Invalid`].
//!
//! ## How a Line is Decoded
//!
//! 1. Trim surrounding whitespace (this also drops a trailing `\r`)
//! 2. Lowercase the whole line, values included
//! 3. Split on single spaces. Consecutive spaces produce empty tokens, so
//!    `set  a b` has four tokens and is invalid
//! 4. Match on the exact token count and the first token

use crate::protocol::types::Command;

/// Normalises a line into its tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    line.trim()
        .to_lowercase()
        .split(' ')
        .map(str::to_string)
        .collect()
}

/// Parses one request line into a command.
///
/// # Example
///
/// ```
/// use linekv::protocol::{parse_request, Command};
///
/// assert_eq!(
///     parse_request("  SET foo Bar \r"),
///     Command::Set { key: "foo".into(), value: "bar".into() }
/// );
/// assert_eq!(parse_request("foo bar baz qux"), Command::Invalid);
/// ```
pub fn parse_request(line: &str) -> Command {
    let tokens = tokenize(line);

    match tokens.as_slice() {
        [cmd, key, value] if cmd == "set" => Command::Set {
            key: key.clone(),
            value: value.clone(),
        },
        [cmd, key] if cmd == "get" => Command::Get { key: key.clone() },
        [cmd, key] if cmd == "del" => Command::Del { key: key.clone() },
        [cmd] if cmd == "quit" => Command::Quit,
        _ => Command::Invalid,
    }
}
