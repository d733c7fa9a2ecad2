//! Configuration for linekv
//!
//! Centralized configuration. The defaults listen on port 6379 on all
//! interfaces, drain for 10 seconds, and treat both a missing key and an
//! accept error as the end of the session or server.

use std::path::PathBuf;
use std::time::Duration;

/// Default drain grace period before live connections are force closed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Default snapshot location handed to the store.
pub const DEFAULT_SNAPSHOT_PATH: &str = "snapshot.json";

/// What the connection does after a `get` on a missing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// Reply with the error, then end the session
    #[default]
    CloseConnection,

    /// Reply with the error and keep reading commands
    KeepOpen,
}

/// How the accept loop reacts to an accept error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptErrorPolicy {
    /// Stop the accept loop and fail the hub; the process is expected to exit
    #[default]
    Abort,

    /// Log the error and keep accepting
    LogAndContinue,
}

/// How long draining waits before force closing connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainMode {
    /// Always wait the full grace period, even if every client has left
    #[default]
    FullGracePeriod,

    /// Stop waiting as soon as the registry is empty
    EarlyExit,
}

/// Main configuration for a linekv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Host to bind to
    pub host: String,

    /// Port to listen on (0 picks a free port)
    pub port: u16,

    /// Appended to every reply when set. The protocol itself has no framing.
    pub reply_terminator: Option<String>,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Snapshot file location. Stored on the store, never written.
    pub snapshot_path: PathBuf,

    // -------------------------------------------------------------------------
    // Lifecycle Configuration
    // -------------------------------------------------------------------------
    /// Time between the drain warning and the forced close
    pub grace_period: Duration,

    /// Whether draining may finish before the grace period elapses
    pub drain_mode: DrainMode,

    /// Behavior of `get` on a missing key
    pub missing_key_policy: MissingKeyPolicy,

    /// Behavior of the accept loop on errors
    pub accept_error_policy: AcceptErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            reply_terminator: None,
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            grace_period: DEFAULT_GRACE_PERIOD,
            drain_mode: DrainMode::default(),
            missing_key_policy: MissingKeyPolicy::default(),
            accept_error_policy: AcceptErrorPolicy::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the host to bind to
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the port to listen on
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the string appended to every reply
    pub fn reply_terminator(mut self, terminator: Option<String>) -> Self {
        self.config.reply_terminator = terminator;
        self
    }

    /// Set the snapshot path
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = path.into();
        self
    }

    /// Set the drain grace period
    pub fn grace_period(mut self, period: Duration) -> Self {
        self.config.grace_period = period;
        self
    }

    /// Set the drain mode
    pub fn drain_mode(mut self, mode: DrainMode) -> Self {
        self.config.drain_mode = mode;
        self
    }

    /// Set the missing key policy
    pub fn missing_key_policy(mut self, policy: MissingKeyPolicy) -> Self {
        self.config.missing_key_policy = policy;
        self
    }

    /// Set the accept error policy
    pub fn accept_error_policy(mut self, policy: AcceptErrorPolicy) -> Self {
        self.config.accept_error_policy = policy;
        self
    }

    /// Build the config
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.bind_address(), "0.0.0.0:6379");
        assert_eq!(config.grace_period, Duration::from_secs(10));
        assert_eq!(config.snapshot_path, PathBuf::from("snapshot.json"));
        assert_eq!(config.drain_mode, DrainMode::FullGracePeriod);
        assert_eq!(config.missing_key_policy, MissingKeyPolicy::CloseConnection);
        assert_eq!(config.accept_error_policy, AcceptErrorPolicy::Abort);
        assert!(config.reply_terminator.is_none());
    }

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .host("127.0.0.1")
            .port(7000)
            .grace_period(Duration::from_millis(250))
            .drain_mode(DrainMode::EarlyExit)
            .missing_key_policy(MissingKeyPolicy::KeepOpen)
            .accept_error_policy(AcceptErrorPolicy::LogAndContinue)
            .reply_terminator(Some("\n".to_string()))
            .snapshot_path("/tmp/snap.json")
            .build();

        assert_eq!(config.bind_address(), "127.0.0.1:7000");
        assert_eq!(config.grace_period, Duration::from_millis(250));
        assert_eq!(config.drain_mode, DrainMode::EarlyExit);
        assert_eq!(config.missing_key_policy, MissingKeyPolicy::KeepOpen);
        assert_eq!(config.accept_error_policy, AcceptErrorPolicy::LogAndContinue);
        assert_eq!(config.reply_terminator.as_deref(), Some("\n"));
        assert_eq!(config.snapshot_path, PathBuf::from("/tmp/snap.json"));
    }
}
