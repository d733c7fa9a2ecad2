//! Shared Connection Writer
//!
//! The write half of a client connection is used from two places: the
//! connection's own handler loop (replies) and the hub (the drain warning and
//! the forced close). [`ConnectionWriter`] is a cheap-to-clone handle over that
//! write half.
//!
//! Closing takes the underlying writer out and shuts it down. Any later write
//! fails with [`std::io::ErrorKind::NotConnected`].

use crate::protocol::Reply;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{trace, warn};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A shareable handle to the write side of one connection.
#[derive(Clone)]
pub struct ConnectionWriter {
    inner: Arc<Mutex<Option<BoxedWriter>>>,
    terminator: Option<Arc<str>>,
}

impl std::fmt::Debug for ConnectionWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionWriter")
            .field("terminator", &self.terminator)
            .finish_non_exhaustive()
    }
}

impl ConnectionWriter {
    /// Wraps a write half. `terminator` is appended to every reply.
    pub fn new<W>(writer: W, terminator: Option<&str>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: BoxedWriter = Box::new(writer);
        Self {
            inner: Arc::new(Mutex::new(Some(writer))),
            terminator: terminator.map(Arc::from),
        }
    }

    /// Writes raw bytes and flushes.
    pub async fn send(&self, data: &[u8]) -> io::Result<()> {
        let mut guard = self.inner.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))?;

        writer.write_all(data).await?;
        writer.flush().await
    }

    /// Serializes and writes a reply.
    pub async fn send_reply(&self, reply: &Reply) -> io::Result<()> {
        let bytes = reply.serialize(self.terminator.as_deref());
        self.send(&bytes).await
    }

    /// Shuts the write side down. Closing twice is a no-op.
    pub async fn close(&self) -> io::Result<()> {
        let writer = self.inner.lock().await.take();
        match writer {
            Some(mut writer) => writer.shutdown().await,
            None => Ok(()),
        }
    }
}

/// Sends a reply, logging instead of returning any failure.
pub async fn write_to_client(writer: &ConnectionWriter, reply: &Reply) {
    match writer.send_reply(reply).await {
        Ok(()) => trace!(reply = %reply, "Sent reply"),
        Err(e) => warn!(error = %e, "failed to write to client"),
    }
}
