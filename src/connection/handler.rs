//! Connection Handler Module
//!
//! This module handles individual client connections to linekv.
//! Each client gets its own handler task that runs in a loop,
//! reading lines and sending replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects, hub registers it
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Read bytes (or close signal)│
//!    │  Split complete lines        │
//!    │  Execute command             │
//!    │  Send reply                  │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. EOF / quit / missing key / forced close / error
//!        │
//!        ▼
//! 5. Writer shut down, handler task ends, hub deregisters it
//! ```
//!
//! ## Buffer Management
//!
//! We use a BytesMut buffer to accumulate incoming data. TCP is a stream
//! protocol, so a read may hold half a line or several lines at once.

use crate::commands::{Action, CommandHandler};
use crate::connection::writer::{write_to_client, ConnectionWriter};
use crate::protocol::{parse_request, Reply};
use bytes::BytesMut;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Identifier assigned to each accepted connection.
pub type ConnectionId = u64;

/// Maximum length of a single request line (64 KB)
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Why a handler loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client closed its side of the connection
    ClientClosed,

    /// The client sent `quit`
    Quit,

    /// A `get` missed and the session was closed
    MissingKey,

    /// The hub closed the connection while draining
    ForceClosed,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::ClientClosed => "client closed",
            CloseReason::Quit => "quit",
            CloseReason::MissingKey => "key not found",
            CloseReason::ForceClosed => "force closed",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A line grew past the size limit without a newline
    #[error("line too long: {len} bytes (max: {max})")]
    LineTooLong { len: usize, max: usize },
}

/// Handles a single client connection.
///
/// This struct owns the read side and the line buffer for one client. The
/// write side is a [`ConnectionWriter`] shared with the hub.
pub struct ConnectionHandler<R> {
    /// Connection id (for logging)
    id: ConnectionId,

    /// Read side of the connection
    reader: R,

    /// Write side of the connection (shared with the hub)
    writer: ConnectionWriter,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler
    command_handler: CommandHandler,

    /// Flips to `true` when the hub force closes this connection
    close_rx: watch::Receiver<bool>,
}

impl<R> ConnectionHandler<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a new connection handler.
    pub fn new(
        id: ConnectionId,
        reader: R,
        writer: ConnectionWriter,
        command_handler: CommandHandler,
        close_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            reader,
            writer,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            close_rx,
        }
    }

    /// Runs the main connection loop.
    ///
    /// Reads lines from the client, executes them, and sends back replies
    /// until the session ends. The write side is always shut down on return.
    pub async fn run(mut self) -> Result<CloseReason, ConnectionError> {
        let result = self.main_loop().await;

        match &result {
            Ok(reason) => debug!(id = self.id, reason = %reason, "Handler loop finished"),
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(id = self.id, "Connection reset by client")
            }
            Err(e) => warn!(id = self.id, error = %e, "Connection error"),
        }

        if let Err(e) = self.writer.close().await {
            debug!(id = self.id, error = %e, "failed to close tcp connection");
        }

        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<CloseReason, ConnectionError> {
        loop {
            // Handle every complete line already buffered
            while let Some(line) = self.next_line()? {
                if let Some(reason) = self.process_line(&line).await {
                    return Ok(reason);
                }
            }

            // Need more data - read from the socket unless we are told to stop
            let n = tokio::select! {
                result = self.reader.read_buf(&mut self.buffer) => result?,
                _ = self.close_rx.wait_for(|closed| *closed) => {
                    return Ok(CloseReason::ForceClosed);
                }
            };

            if n == 0 {
                // A final line without a newline is still a request
                if !self.buffer.is_empty() {
                    let rest = self.buffer.split();
                    let line = String::from_utf8_lossy(&rest).into_owned();
                    if let Some(reason) = self.process_line(&line).await {
                        return Ok(reason);
                    }
                }
                return Ok(CloseReason::ClientClosed);
            }

            trace!(id = self.id, bytes = n, "Read data");
        }
    }

    /// Splits the next complete line off the buffer, without its newline.
    fn next_line(&mut self) -> Result<Option<String>, ConnectionError> {
        match self.buffer.iter().position(|b| *b == b'\n') {
            Some(pos) if pos > MAX_LINE_LENGTH => Err(ConnectionError::LineTooLong {
                len: pos,
                max: MAX_LINE_LENGTH,
            }),
            Some(pos) => {
                let line = self.buffer.split_to(pos + 1);
                Ok(Some(String::from_utf8_lossy(&line[..pos]).into_owned()))
            }
            None if self.buffer.len() > MAX_LINE_LENGTH => Err(ConnectionError::LineTooLong {
                len: self.buffer.len(),
                max: MAX_LINE_LENGTH,
            }),
            None => Ok(None),
        }
    }

    /// Executes one line. Returns a reason when the session must end.
    async fn process_line(&mut self, line: &str) -> Option<CloseReason> {
        let command = parse_request(line);
        trace!(id = self.id, command = command.name(), "Executing command");

        let outcome = self.command_handler.execute(command);

        match outcome.action {
            Action::Continue => self.reply(&outcome.reply).await.err(),
            Action::CloseAfterReply => Some(
                self.reply(&outcome.reply)
                    .await
                    .err()
                    .unwrap_or(CloseReason::MissingKey),
            ),
            Action::CloseBeforeReply => {
                if let Err(e) = self.writer.close().await {
                    warn!(id = self.id, error = %e, "failed to close tcp connection");
                }
                // Best effort: the transport is already closed
                write_to_client(&self.writer, &outcome.reply).await;
                Some(CloseReason::Quit)
            }
        }
    }

    /// Writes a reply, abandoning the write if the hub force closes the
    /// connection while it is pending.
    async fn reply(&mut self, reply: &Reply) -> Result<(), CloseReason> {
        tokio::select! {
            biased;
            _ = self.close_rx.wait_for(|closed| *closed) => Err(CloseReason::ForceClosed),
            _ = write_to_client(&self.writer, reply) => Ok(()),
        }
    }
}
