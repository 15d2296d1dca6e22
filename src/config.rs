//! Configuration for linelog
//!
//! Centralized configuration with sensible defaults, a builder, and an
//! optional TOML file. Precedence is defaults < file < explicit overrides.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ServerError};

/// Well-known listening port
pub const DEFAULT_PORT: u16 = 9000;

/// Pending connection queue length passed to listen(2)
pub const DEFAULT_BACKLOG: i32 = 5;

/// Backing file for the shared store
pub const DEFAULT_DATA_FILE: &str = "/var/tmp/aesdsocketdata";

/// Main configuration for a linelog server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP port to listen on
    pub port: u16,

    /// Address to bind. `None` binds every local interface, dual-stack
    /// when IPv6 is available.
    pub bind_host: Option<IpAddr>,

    /// listen(2) backlog
    pub backlog: i32,

    /// Size of each receive call's scratch buffer (bytes)
    pub recv_buffer_size: usize,

    /// Upper bound on buffered bytes that have not yet formed a message
    pub max_pending_bytes: usize,

    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Backing file of the shared store. Removed on shutdown.
    pub data_file: PathBuf,

    /// Sync strategy: whether each append is fsynced
    pub sync_strategy: StoreSyncStrategy,

    // -------------------------------------------------------------------------
    // Announcer Configuration
    // -------------------------------------------------------------------------
    /// Period between timestamp records
    pub announce_interval: Duration,

    // -------------------------------------------------------------------------
    // Process Configuration
    // -------------------------------------------------------------------------
    /// Detach from the controlling terminal before serving
    pub daemonize: bool,
}

/// Store sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreSyncStrategy {
    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// Leave flushing to the OS page cache
    OsBuffered,
}

impl std::str::FromStr for StoreSyncStrategy {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "every-write" => Ok(StoreSyncStrategy::EveryWrite),
            "os-buffered" => Ok(StoreSyncStrategy::OsBuffered),
            other => Err(ServerError::Config(format!(
                "unknown sync strategy '{}' (expected every-write or os-buffered)",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_host: None,
            backlog: DEFAULT_BACKLOG,
            recv_buffer_size: 1024,
            max_pending_bytes: 16 * 1024 * 1024, // 16 MB
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            sync_strategy: StoreSyncStrategy::EveryWrite,
            announce_interval: Duration::from_secs(10),
            daemonize: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a TOML config file, layered over the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse TOML config text, layered over the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(contents).map_err(|e| ServerError::Config(e.to_string()))?;
        let config = file.apply(Config::default());
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.backlog <= 0 {
            return Err(ServerError::Config(format!(
                "backlog must be positive, got {}",
                self.backlog
            )));
        }
        if self.recv_buffer_size == 0 {
            return Err(ServerError::Config("recv_buffer_size must be non-zero".into()));
        }
        if self.max_pending_bytes == 0 {
            return Err(ServerError::Config("max_pending_bytes must be non-zero".into()));
        }
        if self.announce_interval.is_zero() {
            return Err(ServerError::Config("announce interval must be non-zero".into()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an existing config instead of the defaults
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the TCP port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Bind a single address instead of every interface
    pub fn bind_host(mut self, host: IpAddr) -> Self {
        self.config.bind_host = Some(host);
        self
    }

    /// Set the listen(2) backlog
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.config.backlog = backlog;
        self
    }

    /// Set the receive scratch buffer size (in bytes)
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// Set the pending-buffer limit (in bytes)
    pub fn max_pending_bytes(mut self, size: usize) -> Self {
        self.config.max_pending_bytes = size;
        self
    }

    /// Set the store's backing file
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_file = path.into();
        self
    }

    /// Set the store sync strategy
    pub fn sync_strategy(mut self, strategy: StoreSyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the announcer period
    pub fn announce_interval(mut self, interval: Duration) -> Self {
        self.config.announce_interval = interval;
        self
    }

    /// Run detached from the terminal
    pub fn daemonize(mut self, daemonize: bool) -> Self {
        self.config.daemonize = daemonize;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// TOML File Layout
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    announcer: AnnouncerSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    host: Option<IpAddr>,
    port: Option<u16>,
    backlog: Option<i32>,
    recv_buffer_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreSection {
    path: Option<PathBuf>,
    sync: Option<StoreSyncStrategy>,
    max_pending_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnnouncerSection {
    interval_secs: Option<u64>,
}

impl FileConfig {
    fn apply(self, mut config: Config) -> Config {
        if let Some(host) = self.server.host {
            config.bind_host = Some(host);
        }
        if let Some(port) = self.server.port {
            config.port = port;
        }
        if let Some(backlog) = self.server.backlog {
            config.backlog = backlog;
        }
        if let Some(size) = self.server.recv_buffer_size {
            config.recv_buffer_size = size;
        }
        if let Some(path) = self.store.path {
            config.data_file = path;
        }
        if let Some(sync) = self.store.sync {
            config.sync_strategy = sync;
        }
        if let Some(limit) = self.store.max_pending_bytes {
            config.max_pending_bytes = limit;
        }
        if let Some(secs) = self.announcer.interval_secs {
            config.announce_interval = Duration::from_secs(secs);
        }
        config
    }
}
