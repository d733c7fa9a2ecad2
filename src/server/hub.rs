//! Connection Hub
//!
//! Owns the listening socket, the accept loop task and the registry of live
//! connections, and runs the shutdown sequence.
//!
//! ## States
//!
//! ```text
//!             stop()                         grace period
//!  Running ───────────> Draining ─────────────────────────> Stopped
//!     │                  close listener                      (stop() returns)
//!     │                  warn live clients
//!     │                  wait, then force close
//!     │
//!     └── fatal accept error ──> Failed
//! ```
//!
//! The accept loop races `accept()` against the stop signal, so a stop
//! request is observed immediately rather than on a polling tick.

use crate::commands::CommandHandler;
use crate::config::{AcceptErrorPolicy, Config, DrainMode};
use crate::connection::{ConnectionHandler, ConnectionWriter};
use crate::protocol::Reply;
use crate::server::registry::ConnectionRegistry;
use crate::storage::KeyValueStore;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Upper bound for a single warning write or close during the drain, so one
/// stuck client cannot hold up the others.
const CLIENT_IO_TIMEOUT: Duration = Duration::from_secs(1);

/// How long to wait for force-closed handlers to deregister.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause after a tolerated accept error, so a persistent failure such as
/// running out of file descriptors does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Lifecycle state of the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubState {
    /// Accepting connections
    Running,
    /// Listener closed, existing connections being warned and closed
    Draining,
    /// Terminal: every connection has been closed
    Stopped,
    /// Terminal: the accept loop hit a fatal error
    Failed,
}

/// Errors raised by the hub.
#[derive(Debug, Error)]
pub enum HubError {
    /// The listener could not be bound
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// `accept()` failed and the policy is to abort
    #[error("failed to accept tcp connection: {0}")]
    Accept(#[source] io::Error),

    /// The accept loop task panicked or was cancelled
    #[error("accept loop task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Settings the drain needs, copied out of [`Config`].
#[derive(Debug, Clone, Copy)]
struct DrainSettings {
    grace_period: Duration,
    mode: DrainMode,
}

/// Source of incoming connections for the accept loop.
pub(crate) trait Acceptor: Send + 'static {
    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Handle to a running hub.
///
/// # Example
///
/// ```no_run
/// use linekv::{Config, Hub, KeyValueStore};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), linekv::HubError> {
/// let config = Config::default();
/// let store = Arc::new(KeyValueStore::new(config.snapshot_path.clone()));
///
/// let hub = Hub::start(&config, store).await?;
/// tokio::signal::ctrl_c().await.ok();
/// hub.stop().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Hub {
    local_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<HubState>,
    task: JoinHandle<Result<(), HubError>>,
}

impl Hub {
    /// Binds the listener and starts the accept loop.
    ///
    /// A bind failure is returned as [`HubError::Bind`]; there is no retry.
    pub async fn start(config: &Config, store: Arc<KeyValueStore>) -> Result<Self, HubError> {
        let addr = config.bind_address();
        let bind_error = |source| HubError::Bind {
            addr: addr.clone(),
            source,
        };

        let listener = TcpListener::bind(&addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        Ok(Self::spawn(listener, local_addr, config, store))
    }

    /// Starts the accept loop over an already bound acceptor.
    pub(crate) fn spawn<A: Acceptor>(
        acceptor: A,
        local_addr: SocketAddr,
        config: &Config,
        store: Arc<KeyValueStore>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(HubState::Running);
        let registry = Arc::new(ConnectionRegistry::new());

        let accept_loop = AcceptLoop {
            registry: Arc::clone(&registry),
            command_handler: CommandHandler::new(store, config.missing_key_policy),
            reply_terminator: config.reply_terminator.clone(),
            accept_error_policy: config.accept_error_policy,
            drain: DrainSettings {
                grace_period: config.grace_period,
                mode: config.drain_mode,
            },
            state_tx,
        };

        info!(addr = %local_addr, "starting cache server");
        let task = tokio::spawn(accept_loop.run(acceptor, stop_rx));

        Self {
            local_addr,
            registry,
            stop_tx,
            state_rx,
            task,
        }
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HubState {
        *self.state_rx.borrow()
    }

    /// A receiver that observes every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<HubState> {
        self.state_rx.clone()
    }

    /// Number of registered (live) connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Resolves if the accept loop ends on its own, which only happens on a
    /// fatal accept error (or a panic). Never resolves while running normally.
    pub async fn failed(&self) {
        let mut state_rx = self.state_rx.clone();
        let _ = state_rx.wait_for(|state| *state == HubState::Failed).await;
    }

    /// Stops the hub and waits until every connection has been closed.
    ///
    /// Consumes the hub, so it can only be called once. If the accept loop
    /// already failed, its error is returned.
    pub async fn stop(self) -> Result<(), HubError> {
        info!("stopping cache server");
        self.stop_tx.send_replace(true);

        self.task.await??;

        info!("cache server stopped successfully");
        Ok(())
    }
}

/// State owned by the accept loop task.
struct AcceptLoop {
    registry: Arc<ConnectionRegistry>,
    command_handler: CommandHandler,
    reply_terminator: Option<String>,
    accept_error_policy: AcceptErrorPolicy,
    drain: DrainSettings,
    state_tx: watch::Sender<HubState>,
}

impl AcceptLoop {
    async fn run<A: Acceptor>(
        self,
        mut acceptor: A,
        mut stop_rx: watch::Receiver<bool>,
    ) -> Result<(), HubError> {
        loop {
            tokio::select! {
                // Also fires if the Hub handle was dropped without stop()
                _ = stop_requested(&mut stop_rx) => break,
                result = acceptor.accept() => match result {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer),
                    Err(e) => match self.accept_error_policy {
                        AcceptErrorPolicy::Abort => {
                            error!(error = %e, "failed to accept tcp connection");
                            self.state_tx.send_replace(HubState::Failed);
                            return Err(HubError::Accept(e));
                        }
                        AcceptErrorPolicy::LogAndContinue => {
                            warn!(error = %e, "failed to accept tcp connection");
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    },
                },
            }
        }

        self.state_tx.send_replace(HubState::Draining);
        info!("releasing tcp listener");
        drop(acceptor);

        drain_connections(&self.registry, self.drain).await;

        self.state_tx.send_replace(HubState::Stopped);
        Ok(())
    }

    /// Registers a new connection and spawns its handler task.
    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.registry.next_id();
        let (reader, writer) = stream.into_split();
        let writer = ConnectionWriter::new(writer, self.reply_terminator.as_deref());

        let close_rx = self.registry.register(id, peer, writer.clone());
        let handler =
            ConnectionHandler::new(id, reader, writer, self.command_handler.clone(), close_rx);
        let registry = Arc::clone(&self.registry);

        info!(id, peer = %peer, "client connected");
        tokio::spawn(async move {
            let result = handler.run().await;
            registry.deregister(id);
            match result {
                Ok(reason) => info!(id, reason = %reason, "client disconnected"),
                Err(e) => info!(id, error = %e, "client disconnected"),
            }
        });
    }
}

async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stop| *stop).await;
}

/// Warns live connections, waits out the grace period, then force closes
/// whatever is still registered.
async fn drain_connections(registry: &ConnectionRegistry, settings: DrainSettings) {
    let live = registry.len();
    if live == 0 {
        return;
    }

    info!(connections = live, "warning connections about shutdown");
    warn_all(registry).await;

    match settings.mode {
        DrainMode::FullGracePeriod => tokio::time::sleep(settings.grace_period).await,
        DrainMode::EarlyExit => {
            tokio::select! {
                _ = tokio::time::sleep(settings.grace_period) => {}
                _ = registry.wait_empty() => {
                    info!("all connections closed before the grace period elapsed");
                }
            }
        }
    }

    close_all(registry).await;

    if timeout(SETTLE_TIMEOUT, registry.wait_empty()).await.is_err() {
        warn!(
            connections = registry.len(),
            "connections still registered after forced close"
        );
    }
}

/// Best effort: failures are logged and ignored.
async fn warn_all(registry: &ConnectionRegistry) {
    for (id, writer) in registry.writers() {
        match timeout(CLIENT_IO_TIMEOUT, writer.send_reply(&Reply::ShutdownWarning)).await {
            Ok(Ok(())) => debug!(id, "warned connection"),
            Ok(Err(e)) => {
                warn!(id, peer = ?registry.peer(id), error = %e, "failed to warn connection")
            }
            Err(_) => warn!(id, peer = ?registry.peer(id), "timed out warning connection"),
        }
    }
}

async fn close_all(registry: &ConnectionRegistry) {
    let connections = registry.signal_close_all();
    if connections.is_empty() {
        return;
    }

    info!(connections = connections.len(), "closing all connections");
    for (id, writer) in connections {
        match timeout(CLIENT_IO_TIMEOUT, writer.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(id, error = %e, "failed to close connection"),
            Err(_) => warn!(id, "timed out closing connection"),
        }
    }
}
